//! `wr-audio` — Realtime mixing and playback engine for game audio.
//!
//! The engine accepts short pre-decoded PCM sound effects and longer music
//! tracks and produces a single interleaved stereo f32 stream for the host
//! audio device:
//!
//! - **Sounds**: whole decoded PCM buffers with overlapping play instances,
//!   re-trigger throttling, linear fade-in/out and crossfaded looping
//! - **Mixing**: additive multiplexing of every active sound into the
//!   device callback buffer, allocation-free on the real-time path
//! - **Channels**: named logical groups (music, sfx, dialog, ...) with
//!   runtime volume and pause control
//! - **Context**: process-wide singleton owning the one mixer and driver
//!
//! # Architecture
//!
//! ```text
//! game threads                      real-time thread
//! Sound::play / stop ...            cpal callback (or silent sink)
//!        |                                 |
//!        v                                 v
//!   Mixer active set  <------------- Mixer::fill
//!        |                                 |
//!   ChannelTable (volume / pause) ---------+
//! ```
//!
//! Playback calls mutate a sound's play instances under its own mutex and
//! register the sound with the mixer; the device callback snapshots the
//! active set and accumulates every sound into the output buffer. Channel
//! settings are read once per sound per callback, so updates land at the
//! next buffer boundary.
//!
//! Decoding to f32 PCM at the context sample rate is the host's concern;
//! the engine performs no resampling and no effects processing.

pub mod channel;
pub mod context;
mod driver;
pub mod error;
pub mod mixer;
mod output;
pub mod sound;

// Re-export primary types and the singleton facades at the crate root.
pub use channel::{ChannelId, ChannelSettings};
pub use context::{current, err, init, resume, sample_rate, suspend};
pub use context::{Context, ContextOptions, ReadyLatch};
pub use error::AudioError;
pub use mixer::Mixer;
pub use sound::Sound;
