//! Logical channels for coarse-grained runtime control.
//!
//! A channel groups sounds for volume and pause control: music, ambience,
//! sound effects, dialog and so on. It is not a stereo channel. Every sound
//! is tagged with one [`ChannelId`] at construction and reads that channel's
//! settings once per mix call, so updates land at the next buffer boundary.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Identifier of a logical mixing channel.
///
/// The well-known ids cover the usual game groupings; `Custom` leaves room
/// for host-defined channels beyond that set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Default,
    Music,
    Ambience,
    Sfx,
    Ui,
    Dialog,
    /// Host-defined channel beyond the well-known set.
    Custom(u16),
}

/// Runtime settings shared by every sound tagged with a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelSettings {
    /// Gain applied on top of each sound's own volume. Defaults to 1.0.
    pub volume: f32,
    /// While true the channel contributes silence and playback positions
    /// freeze in place.
    pub paused: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            paused: false,
        }
    }
}

/// Per-channel settings table.
///
/// Reads come from the real-time callback, writes from game threads; the
/// table is a reader-preferring `RwLock` map and entries are created lazily
/// on first write. A read of an id that was never written returns the
/// defaults without inserting.
pub(crate) struct ChannelTable {
    settings: RwLock<HashMap<ChannelId, ChannelSettings>>,
}

impl ChannelTable {
    pub(crate) fn new() -> Self {
        Self {
            settings: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, id: ChannelId) -> ChannelSettings {
        self.settings.read().get(&id).copied().unwrap_or_default()
    }

    pub(crate) fn set_volume(&self, id: ChannelId, volume: f32) {
        self.settings.write().entry(id).or_default().volume = volume;
    }

    pub(crate) fn pause(&self, id: ChannelId) {
        self.settings.write().entry(id).or_default().paused = true;
    }

    pub(crate) fn resume(&self, id: ChannelId) {
        self.settings.write().entry(id).or_default().paused = false;
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.settings.read().len()
    }
}

impl ChannelId {
    /// Set this channel's gain through the current context.
    ///
    /// Convenience for [`Context::set_channel_volume`](crate::Context::set_channel_volume);
    /// a no-op before the context exists.
    pub fn set_volume(self, volume: f32) {
        if let Ok(ctx) = crate::context::current() {
            ctx.set_channel_volume(self, volume);
        }
    }

    /// Pause this channel through the current context. No-op before init.
    pub fn pause(self) {
        if let Ok(ctx) = crate::context::current() {
            ctx.pause_channel(self);
        }
    }

    /// Resume this channel through the current context. No-op before init.
    pub fn resume(self) {
        if let Ok(ctx) = crate::context::current() {
            ctx.resume_channel(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_channel_reads_as_default() {
        let table = ChannelTable::new();

        let settings = table.get(ChannelId::Dialog);
        assert_eq!(settings.volume, 1.0);
        assert!(!settings.paused);
    }

    #[test]
    fn reads_do_not_insert() {
        let table = ChannelTable::new();

        table.get(ChannelId::Music);
        table.get(ChannelId::Custom(7));

        assert_eq!(table.len(), 0);
    }

    #[test]
    fn set_volume_roundtrip() {
        let table = ChannelTable::new();

        table.set_volume(ChannelId::Music, 0.25);

        assert_eq!(table.get(ChannelId::Music).volume, 0.25);
        // Other channels are unaffected.
        assert_eq!(table.get(ChannelId::Sfx).volume, 1.0);
    }

    #[test]
    fn set_volume_is_idempotent() {
        let table = ChannelTable::new();

        table.set_volume(ChannelId::Ui, 0.5);
        table.set_volume(ChannelId::Ui, 0.5);

        assert_eq!(table.get(ChannelId::Ui).volume, 0.5);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn pause_resume_roundtrip() {
        let table = ChannelTable::new();

        table.pause(ChannelId::Sfx);
        assert!(table.get(ChannelId::Sfx).paused);

        table.resume(ChannelId::Sfx);
        assert!(!table.get(ChannelId::Sfx).paused);
    }

    #[test]
    fn pause_keeps_volume() {
        let table = ChannelTable::new();

        table.set_volume(ChannelId::Ambience, 0.8);
        table.pause(ChannelId::Ambience);

        let settings = table.get(ChannelId::Ambience);
        assert!(settings.paused);
        assert_eq!(settings.volume, 0.8);
    }

    #[test]
    fn convenience_methods_are_noops_without_context() {
        // Must not panic or create a context as a side effect.
        ChannelId::Custom(9999).set_volume(0.1);
        ChannelId::Custom(9999).pause();
        ChannelId::Custom(9999).resume();
    }
}
