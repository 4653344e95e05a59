//! Multiplexer of active sounds into the device output buffer.
//!
//! The mixer owns the set of currently-active sounds and exposes
//! [`Mixer::fill`], the engine's sole real-time entry point: the driver
//! calls it with the device buffer, the mixer zeroes it and lets every
//! active sound accumulate its playheads on top. Sounds add and remove
//! themselves through [`activate`](Mixer::activate) /
//! [`deactivate`](Mixer::deactivate) as playback starts and drains.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::ChannelTable;
use crate::sound::SoundState;

/// Owner of the active-sound set and the per-channel settings table.
///
/// One mixer exists per process, held by the context. Membership of the
/// active set is identity-based and mutated only from the sound side; the
/// mixer treats it as an index, not ownership. Sounds belong to the host.
pub struct Mixer {
    sample_rate: u32,
    channel_count: u32,
    channels: ChannelTable,
    active: Mutex<Vec<Arc<SoundState>>>,
    /// Reusable snapshot buffer so `fill` allocates nothing in the steady
    /// state. Only the real-time thread locks it for more than a moment.
    scratch: Mutex<Vec<Arc<SoundState>>>,
}

impl Mixer {
    pub(crate) fn new(sample_rate: u32, channel_count: u32) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            channel_count,
            channels: ChannelTable::new(),
            active: Mutex::new(Vec::new()),
            scratch: Mutex::new(Vec::new()),
        })
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved samples per frame. Always 2 (stereo).
    pub fn channel_count(&self) -> u32 {
        self.channel_count
    }

    pub(crate) fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Add a sound to the active set. Idempotent.
    pub(crate) fn activate(&self, sound: &Arc<SoundState>) {
        let mut active = self.active.lock();
        if !active.iter().any(|s| Arc::ptr_eq(s, sound)) {
            active.push(Arc::clone(sound));
        }
    }

    /// Remove a sound from the active set. Idempotent. A removal issued
    /// while a fill is in flight takes effect on the next fill.
    pub(crate) fn deactivate(&self, sound: &SoundState) {
        let mut active = self.active.lock();
        active.retain(|s| !std::ptr::eq(Arc::as_ptr(s), sound));
    }

    /// Fill `out` with the mixed output of every active sound.
    ///
    /// Zeroes the buffer, snapshots the active set under its lock, releases
    /// the lock, then runs each sound's mix step. The set lock is therefore
    /// never held across a sound lock; iteration order is unspecified and
    /// only affects floating-point rounding at the LSB.
    pub fn fill(&self, out: &mut [f32]) {
        out.fill(0.0);

        let mut scratch = self.scratch.lock();
        scratch.clear();
        scratch.extend(self.active.lock().iter().cloned());
        for sound in scratch.iter() {
            sound.mix_into(out);
        }
        scratch.clear();
    }

    #[cfg(test)]
    pub(crate) fn active_len(&self) -> usize {
        self.active.lock().len()
    }
}
