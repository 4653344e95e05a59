//! In-memory sounds and the per-sound mix step.
//!
//! A [`Sound`] holds a whole decoded stereo PCM buffer plus the state needed
//! to play it any number of times concurrently. Trigger methods run on game
//! threads under the sound's own mutex and register the sound with the
//! mixer; the mix step runs on the real-time thread and accumulates every
//! live playhead into the mixer's output buffer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::channel::ChannelId;
use crate::mixer::Mixer;

/// Minimum spacing between re-triggers of the same sound, in milliseconds.
const DEFAULT_THROTTLING_MS: u32 = 50;

/// One active playhead into a sound's data. All offsets are sample indices
/// (interleaved stereo, so a frame is two samples).
#[derive(Clone, Copy, Debug, Default)]
struct PlayInstance {
    pos: usize,
    /// Below this offset a linear 0..1 gain ramp applies. Zero disables it.
    fade_in_ends_at: usize,
    /// Above this offset a linear ramp toward zero applies; for looping
    /// sounds this is the crossfade splice point instead.
    fade_out_starts_at: usize,
}

struct SoundInner {
    instances: Vec<PlayInstance>,
    throttling_ms: u32,
    looping: bool,
    /// Latched the first time a loop wraps; enables the crossfade branch.
    looped_once: bool,
}

pub(crate) struct SoundState {
    /// Interleaved stereo PCM at the context sample rate. Immutable, so the
    /// real-time thread reads it without synchronization.
    data: Arc<[f32]>,
    volume: f32,
    channel_id: ChannelId,
    mixer: Arc<Mixer>,
    inner: Mutex<SoundInner>,
}

/// A playable sound effect or music track.
///
/// Created from interleaved stereo f32 PCM via
/// [`Context::new_sound`](crate::Context::new_sound). All methods are safe
/// to call from any thread. Dropping the handle stops playback and removes
/// the sound from the mixer deterministically; hosts that need shared
/// lifetime wrap the handle in an `Arc`.
pub struct Sound {
    state: Arc<SoundState>,
}

impl Sound {
    pub(crate) fn new(
        mixer: &Arc<Mixer>,
        mut data: Vec<f32>,
        volume: f32,
        channel_id: ChannelId,
    ) -> Self {
        if data.len() % 2 != 0 {
            warn!(
                samples = data.len(),
                "sound data is not frame-aligned, dropping trailing sample"
            );
            data.pop();
        }
        Self {
            state: Arc::new(SoundState {
                data: data.into(),
                volume,
                channel_id,
                mixer: Arc::clone(mixer),
                inner: Mutex::new(SoundInner {
                    instances: Vec::new(),
                    throttling_ms: DEFAULT_THROTTLING_MS,
                    looping: false,
                    looped_once: false,
                }),
            }),
        }
    }

    /// Start a new playback from the beginning.
    ///
    /// A call within the throttling window of a previous trigger is ignored;
    /// calls spaced further apart overlap, and the overlapping playheads sum
    /// into the output.
    pub fn play(&self) {
        let mut inner = self.state.inner.lock();
        self.play_impl(&mut inner, 0, self.state.data.len());
    }

    /// Start a new playback with a linear fade-in of the given length.
    pub fn play_fade_in(&self, fade_in: Duration) {
        let mut inner = self.state.inner.lock();
        let fade = self.fade_samples(fade_in);
        self.play_impl(&mut inner, fade, self.state.data.len());
    }

    /// Start looping playback with a crossfaded splice at the wrap point.
    ///
    /// A no-op if the sound is already looping. If instances of this sound
    /// are currently playing they all switch to looping and the first one
    /// keeps its playhead. Crossfades longer than half the sound are
    /// clamped.
    pub fn play_loop(&self, crossfade: Duration) {
        let mut inner = self.state.inner.lock();
        if inner.looping {
            return;
        }
        inner.looping = true;
        inner.looped_once = false;
        let fade = self.fade_samples(crossfade).min(self.state.data.len() / 2);
        self.play_impl(&mut inner, fade, self.state.data.len() - fade);
    }

    /// Stop all playback immediately and clear the looping state.
    ///
    /// No sample of this sound appears in any mix buffer filled after this
    /// returns.
    pub fn stop(&self) {
        let mut inner = self.state.inner.lock();
        inner.looping = false;
        inner.instances.clear();
        // Deactivate under the sound lock so a concurrent play cannot
        // interleave between the clear and the removal.
        self.state.mixer.deactivate(&self.state);
        drop(inner);
    }

    /// Drop all play instances without touching the looping flag.
    ///
    /// A sound that was looping stays in the looping state, so `play_loop`
    /// remains a no-op for it until [`stop`](Self::stop) is called.
    pub fn reset(&self) {
        let mut inner = self.state.inner.lock();
        inner.instances.clear();
        self.state.mixer.deactivate(&self.state);
        drop(inner);
    }

    /// Whether any playback of this sound has not yet finished.
    pub fn is_playing(&self) -> bool {
        let inner = self.state.inner.lock();
        inner
            .instances
            .iter()
            .any(|pi| pi.pos < self.state.data.len())
    }

    /// Set the minimum spacing between re-triggers, in milliseconds.
    pub fn set_throttling_ms(&self, ms: u32) {
        self.state.inner.lock().throttling_ms = ms;
    }

    fn fade_samples(&self, d: Duration) -> usize {
        let per_second =
            (self.state.mixer.sample_rate() * self.state.mixer.channel_count()) as f64;
        (per_second * d.as_secs_f64()).round() as usize
    }

    fn play_impl(&self, inner: &mut SoundInner, fade_in_ends_at: usize, fade_out_starts_at: usize) {
        let state = &self.state;
        if state.data.is_empty() {
            return;
        }
        let throttle_window = state.mixer.sample_rate() as usize
            * state.mixer.channel_count() as usize
            * inner.throttling_ms as usize
            / 1000;

        // Re-use an existing play slot if possible.
        let mut free = None;
        for (i, pi) in inner.instances.iter().enumerate() {
            if pi.pos < throttle_window && !inner.looping {
                // Too soon after the previous trigger.
                return;
            }
            if pi.pos >= state.data.len() || inner.looping {
                free = Some(i);
                break;
            }
        }
        let idx = match free {
            Some(i) => i,
            None => {
                inner.instances.push(PlayInstance::default());
                inner.instances.len() - 1
            }
        };
        let pi = &mut inner.instances[idx];
        // A loop takes over the currently playing instance without
        // resetting its playhead.
        if !inner.looping {
            pi.pos = 0;
        }
        pi.fade_in_ends_at = fade_in_ends_at;
        pi.fade_out_starts_at = fade_out_starts_at;

        state.mixer.activate(&self.state);
    }
}

impl Drop for Sound {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock();
        inner.looping = false;
        inner.instances.clear();
        self.state.mixer.deactivate(&self.state);
        drop(inner);
    }
}

impl SoundState {
    /// Mix this sound's live playheads into `out`, advancing their
    /// positions.
    ///
    /// Runs on the real-time thread. `out` is pre-zeroed by the mixer and
    /// samples accumulate, so concurrent sounds sum; no clipping is applied.
    /// A paused channel leaves both the buffer and the playhead positions
    /// untouched. Once every playhead has drained the sound removes itself
    /// from the mixer's active set.
    pub(crate) fn mix_into(&self, out: &mut [f32]) {
        let settings = self.mixer.channels().get(self.channel_id);
        if settings.paused {
            return;
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let data = &self.data;
        let len = data.len();
        if len == 0 {
            self.mixer.deactivate(self);
            return;
        }

        let gain = self.volume * settings.volume;
        let looping = inner.looping;
        let mut looped_once = inner.looped_once;
        let mut finished = true;

        for pi in inner.instances.iter_mut() {
            let available = if looping { out.len() } else { len - pi.pos };
            let n = out.len().min(available);
            let mut loop_adjust = 0usize;
            for i in 0..n {
                let mut di = (pi.pos + i + loop_adjust) % len;
                let mut v = data[di] * gain;
                let mut fade_in = 1.0f32;
                let mut fade_out = 1.0f32;
                if looping && di == pi.fade_out_starts_at {
                    // Crossfade splice: jump this playhead to the next lap.
                    loop_adjust += len - pi.fade_out_starts_at;
                    di = (pi.pos + i + loop_adjust) % len;
                    v = data[di] * gain;
                    looped_once = true;
                } else if di > pi.fade_out_starts_at && pi.fade_out_starts_at < len {
                    let tail_len = (len - pi.fade_out_starts_at) as f32;
                    fade_out = 1.0 - (di - pi.fade_out_starts_at) as f32 / tail_len;
                }
                if di < pi.fade_in_ends_at {
                    fade_in = di as f32 / pi.fade_in_ends_at as f32;
                    if looping && looped_once {
                        // Second leg of the loop crossfade: blend the new
                        // lap's head against the previous lap's tail.
                        let tail = data[(di + pi.fade_out_starts_at) % len] * gain;
                        out[i] += v * fade_in + (1.0 - fade_in) * tail;
                        continue;
                    }
                }
                out[i] += v * fade_in * fade_out;
            }
            pi.pos += n;
            if looping {
                pi.pos %= len;
            }
            if pi.pos < len {
                finished = false;
            }
        }
        inner.looped_once = looped_once;

        if finished {
            self.mixer.deactivate(self);
        }
    }
}
