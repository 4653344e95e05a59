//! Driver binding: the dedicated thread that owns the platform stream and
//! pulls the mixer.
//!
//! `cpal` streams are not `Send`, so the stream is created and kept alive on
//! a dedicated `audio-driver` thread for the life of the process. Driver
//! initialization can take a while, so it happens asynchronously: the ready
//! latch closes once a backend is up or startup has definitively failed.
//!
//! The thread tries the cpal backend first. A host without any output
//! device falls back to a silent sink that keeps pulling the mixer at the
//! paced real-time rate, so gameplay code behaves identically on machines
//! without audio.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{error, info, warn};

use crate::context::ReadyLatch;
use crate::error::{AudioError, ErrorCell};
use crate::mixer::Mixer;
use crate::output::OutputStream;

/// Samples pulled per iteration of the silent sink.
const NULL_PULL_SAMPLES: usize = 4096;

pub(crate) enum DriverCommand {
    Suspend,
    Resume,
}

/// Game-thread handle to the driver thread.
pub(crate) struct DriverHandle {
    commands: Sender<DriverCommand>,
}

impl DriverHandle {
    /// Returns false when the driver thread is no longer running.
    pub(crate) fn suspend(&self) -> bool {
        self.commands.send(DriverCommand::Suspend).is_ok()
    }

    /// Returns false when the driver thread is no longer running.
    pub(crate) fn resume(&self) -> bool {
        self.commands.send(DriverCommand::Resume).is_ok()
    }
}

/// Start the driver thread. `ready` closes once a backend is accepting
/// samples or initialization has failed (with the failure stored in `err`).
pub(crate) fn spawn(
    mixer: Arc<Mixer>,
    buffer_size: Duration,
    ready: ReadyLatch,
    err: Arc<ErrorCell>,
) -> DriverHandle {
    let (tx, rx) = unbounded();
    let thread_ready = ready.clone();
    let thread_err = Arc::clone(&err);
    let spawned = thread::Builder::new()
        .name("audio-driver".into())
        .spawn(move || run(mixer, buffer_size, thread_ready, thread_err, rx));
    if let Err(e) = spawned {
        err.try_store(AudioError::DriverInit(format!(
            "failed to spawn driver thread: {e}"
        )));
        ready.open();
    }
    DriverHandle { commands: tx }
}

fn run(
    mixer: Arc<Mixer>,
    buffer_size: Duration,
    ready: ReadyLatch,
    err: Arc<ErrorCell>,
    commands: Receiver<DriverCommand>,
) {
    match OutputStream::open(Arc::clone(&mixer), buffer_size) {
        Ok(stream) => {
            info!("audio output stream running");
            ready.open();
            run_stream(stream, commands);
        }
        Err(AudioError::NoDevice) => {
            info!("no audio output device, using silent sink");
            ready.open();
            run_null(mixer, commands);
        }
        Err(e) => {
            error!(error = %e, "audio driver initialization failed");
            err.try_store(AudioError::DriverInit(e.to_string()));
            ready.open();
        }
    }
}

/// Owns the stream and serves suspend/resume until the context goes away.
fn run_stream(stream: OutputStream, commands: Receiver<DriverCommand>) {
    loop {
        match commands.recv() {
            Ok(DriverCommand::Suspend) => {
                if let Err(e) = stream.pause() {
                    warn!(error = %e, "failed to suspend audio stream");
                }
            }
            Ok(DriverCommand::Resume) => {
                if let Err(e) = stream.play() {
                    warn!(error = %e, "failed to resume audio stream");
                }
            }
            Err(_) => break,
        }
    }
}

/// Silent sink: drains the mixer at the paced real-time rate so sound state
/// machines keep advancing on hosts without an audio device.
fn run_null(mixer: Arc<Mixer>, commands: Receiver<DriverCommand>) {
    let mut buf = vec![0.0f32; NULL_PULL_SAMPLES];
    let frames = NULL_PULL_SAMPLES as f64 / mixer.channel_count() as f64;
    let pace = Duration::from_secs_f64(frames / mixer.sample_rate() as f64);
    let mut suspended = false;
    loop {
        if suspended {
            match commands.recv() {
                Ok(DriverCommand::Resume) => suspended = false,
                Ok(DriverCommand::Suspend) => {}
                Err(_) => break,
            }
            continue;
        }
        match commands.recv_timeout(pace) {
            Ok(DriverCommand::Suspend) => suspended = true,
            Ok(DriverCommand::Resume) => {}
            Err(RecvTimeoutError::Timeout) => mixer.fill(&mut buf),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
