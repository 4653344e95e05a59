//! Process-wide audio context: configuration, driver lifecycle, and the
//! engine's singleton entry points.
//!
//! [`init`] creates the one context a process may have, starts the driver
//! asynchronously and hands back a [`ReadyLatch`] the game thread can wait
//! on before issuing playback calls. Every later interaction goes through
//! the returned [`Context`] handle; free-function facades over the
//! singleton exist for convenience.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::info;

use crate::channel::{ChannelId, ChannelSettings};
use crate::driver::{self, DriverHandle};
use crate::error::{AudioError, ErrorCell};
use crate::mixer::Mixer;
use crate::sound::Sound;

/// Interleaved samples per frame. Stereo is the only supported layout.
pub(crate) const CHANNEL_COUNT: u32 = 2;

/// Options for [`init`].
#[derive(Clone, Copy, Debug)]
pub struct ContextOptions {
    /// Output sample rate in Hz, typically 44100 or 48000. Sounds must be
    /// decoded at this rate; the engine performs no resampling.
    pub sample_rate: u32,
    /// Requested device buffer size. Zero selects the driver default.
    /// Larger buffers add latency, smaller ones risk glitches from buffer
    /// shortage.
    pub buffer_size: Duration,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_size: Duration::ZERO,
        }
    }
}

/// One-shot signal that closes once the driver is accepting samples, or has
/// definitively failed (see [`Context::err`]).
#[derive(Clone)]
pub struct ReadyLatch {
    inner: Arc<LatchInner>,
}

struct LatchInner {
    done: Mutex<bool>,
    cond: Condvar,
}

impl ReadyLatch {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(LatchInner {
                done: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    pub(crate) fn open(&self) {
        let mut done = self.inner.done.lock();
        *done = true;
        self.inner.cond.notify_all();
    }

    /// Block until the driver side has come up or failed.
    pub fn wait(&self) {
        let mut done = self.inner.done.lock();
        while !*done {
            self.inner.cond.wait(&mut done);
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.done.lock()
    }
}

static CONTEXT_CREATED: AtomicBool = AtomicBool::new(false);
static CONTEXT: OnceLock<Arc<Context>> = OnceLock::new();

/// The process-wide audio engine instance. Created once by [`init`], lives
/// until process exit.
pub struct Context {
    mixer: Arc<Mixer>,
    driver: DriverHandle,
    err: Arc<ErrorCell>,
}

/// Create the process-wide context and start the audio driver.
///
/// Returns the context handle and a latch that closes once the driver is
/// accepting samples. Driver startup runs asynchronously; a startup failure
/// is reported through [`Context::err`] after the latch closes, except that
/// a host without any output device silently falls back to a silent sink.
/// Creating a second context fails with
/// [`AudioError::ContextAlreadyCreated`].
pub fn init(options: ContextOptions) -> Result<(Arc<Context>, ReadyLatch), AudioError> {
    if CONTEXT_CREATED.swap(true, Ordering::SeqCst) {
        return Err(AudioError::ContextAlreadyCreated);
    }

    let mixer = Mixer::new(options.sample_rate, CHANNEL_COUNT);
    let err = Arc::new(ErrorCell::new());
    let ready = ReadyLatch::new();
    let driver = driver::spawn(
        Arc::clone(&mixer),
        options.buffer_size,
        ready.clone(),
        Arc::clone(&err),
    );

    info!(sample_rate = options.sample_rate, "audio context created");

    let ctx = Arc::new(Context { mixer, driver, err });
    let _ = CONTEXT.set(Arc::clone(&ctx));
    Ok((ctx, ready))
}

/// The current context, or [`AudioError::ContextNotCreated`] before
/// [`init`].
pub fn current() -> Result<Arc<Context>, AudioError> {
    CONTEXT
        .get()
        .cloned()
        .ok_or(AudioError::ContextNotCreated)
}

impl Context {
    /// The context sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    /// Create a ready-to-use sound from interleaved stereo f32 PCM decoded
    /// at the context sample rate.
    ///
    /// `volume` is the per-sound gain and `channel` the logical channel the
    /// sound reads its group gain and pause state from at mix time. Safe to
    /// call from any thread; sounds are independent of each other.
    pub fn new_sound(&self, data: Vec<f32>, volume: f32, channel: ChannelId) -> Sound {
        Sound::new(&self.mixer, data, volume, channel)
    }

    /// Suspend the entire audio output.
    pub fn suspend(&self) -> Result<(), AudioError> {
        if self.driver.suspend() {
            Ok(())
        } else {
            Err(self.driver_down_error())
        }
    }

    /// Resume audio output after [`suspend`](Self::suspend).
    pub fn resume(&self) -> Result<(), AudioError> {
        if self.driver.resume() {
            Ok(())
        } else {
            Err(self.driver_down_error())
        }
    }

    /// The stored driver error, if initialization failed.
    pub fn err(&self) -> Option<AudioError> {
        self.err.load()
    }

    /// Current settings of a logical channel.
    pub fn channel(&self, id: ChannelId) -> ChannelSettings {
        self.mixer.channels().get(id)
    }

    /// Set the gain applied to every sound on `id`, effective at the next
    /// mix call.
    pub fn set_channel_volume(&self, id: ChannelId, volume: f32) {
        self.mixer.channels().set_volume(id, volume);
    }

    /// Pause every sound on `id`. Playback positions freeze until
    /// [`resume_channel`](Self::resume_channel).
    pub fn pause_channel(&self, id: ChannelId) {
        self.mixer.channels().pause(id);
    }

    /// Resume a paused channel from where playback left off.
    pub fn resume_channel(&self, id: ChannelId) {
        self.mixer.channels().resume(id);
    }

    fn driver_down_error(&self) -> AudioError {
        self.err
            .load()
            .unwrap_or_else(|| AudioError::DriverInit("audio driver is not running".into()))
    }
}

/// Facade for [`Context::sample_rate`] on the current context.
pub fn sample_rate() -> Result<u32, AudioError> {
    Ok(current()?.sample_rate())
}

/// Facade for [`Context::suspend`] on the current context.
pub fn suspend() -> Result<(), AudioError> {
    current()?.suspend()
}

/// Facade for [`Context::resume`] on the current context.
pub fn resume() -> Result<(), AudioError> {
    current()?.resume()
}

/// The current error: the stored driver-init failure if there is one, or
/// [`AudioError::ContextNotCreated`] before [`init`].
pub fn err() -> Option<AudioError> {
    match current() {
        Ok(ctx) => ctx.err(),
        Err(e) => Some(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn ready_latch_opens_once() {
        let latch = ReadyLatch::new();
        assert!(!latch.is_ready());

        let opener = latch.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            opener.open();
        });

        latch.wait();
        assert!(latch.is_ready());
        // A second wait returns immediately.
        latch.wait();
        handle.join().unwrap();
    }

    #[test]
    fn context_is_a_process_singleton() {
        // All singleton behavior lives in one test: the test binary shares
        // one process, so ordering across tests would otherwise race.
        assert!(matches!(err(), Some(AudioError::ContextNotCreated)));
        assert!(matches!(
            sample_rate(),
            Err(AudioError::ContextNotCreated)
        ));

        let options = ContextOptions {
            sample_rate: 48_000,
            buffer_size: Duration::ZERO,
        };
        let (ctx, ready) = init(options).expect("first init");
        ready.wait();

        assert_eq!(ctx.sample_rate(), 48_000);
        assert_eq!(sample_rate().unwrap(), 48_000);
        assert!(current().is_ok());

        // Channel operations route through the handle.
        ctx.set_channel_volume(ChannelId::Music, 0.5);
        assert_eq!(ctx.channel(ChannelId::Music).volume, 0.5);
        ChannelId::Music.set_volume(0.75);
        assert_eq!(ctx.channel(ChannelId::Music).volume, 0.75);

        // Sounds are constructed through the context.
        let sound = ctx.new_sound(vec![0.0; 4], 1.0, ChannelId::Sfx);
        assert!(!sound.is_playing());

        let second = init(options);
        assert!(matches!(second, Err(AudioError::ContextAlreadyCreated)));
    }
}
