//! Audio engine error types (thiserror-based).

use parking_lot::Mutex;
use thiserror::Error;

/// Audio engine error type.
///
/// Trigger and mix operations never fail; errors only arise from context
/// lifecycle and driver initialization. The enum is `Clone` so a stored
/// driver-init failure can be surfaced repeatedly by `err()`.
#[derive(Error, Debug, Clone)]
pub enum AudioError {
    /// A second context was created in the same process.
    #[error("audio context is already created")]
    ContextAlreadyCreated,

    /// An operation on the context singleton ran before `init`.
    #[error("audio context is not created")]
    ContextNotCreated,

    /// Driver initialization failed for every backend candidate.
    #[error("audio driver initialization failed: {0}")]
    DriverInit(String),

    /// No audio output device is available on this host.
    #[error("no audio output device found")]
    NoDevice,

    /// Audio output device error.
    #[error("audio output error: {0}")]
    Output(String),

    /// Audio output stream build error.
    #[error("failed to build audio stream: {0}")]
    StreamBuild(String),

    /// Audio output stream play error.
    #[error("failed to start audio stream: {0}")]
    StreamPlay(String),
}

/// First-error-wins storage shared between the driver-init task and the
/// context's `err()` surface.
pub(crate) struct ErrorCell {
    slot: Mutex<Option<AudioError>>,
}

impl ErrorCell {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Store `err` unless an earlier error is already recorded.
    pub(crate) fn try_store(&self, err: AudioError) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn load(&self) -> Option<AudioError> {
        self.slot.lock().clone()
    }
}
