//! CPAL-backed realtime output.
//!
//! Builds a stereo f32 output stream whose data callback pulls the mixer
//! directly. The callback runs on the platform's audio thread: it never
//! allocates and never blocks beyond the short per-sound mutexes.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig};
use tracing::{debug, error, info};

use crate::context::CHANNEL_COUNT;
use crate::error::AudioError;
use crate::mixer::Mixer;

/// A running cpal output stream bound to the mixer.
///
/// `cpal::Stream` is not `Send`; the driver thread that opens the stream
/// keeps it alive for the life of the process.
pub(crate) struct OutputStream {
    stream: Stream,
}

impl OutputStream {
    /// Open the default output device and start pulling the mixer.
    ///
    /// Returns [`AudioError::NoDevice`] when the host has no output device
    /// at all, which the driver treats as the cue for the silent fallback.
    pub(crate) fn open(mixer: Arc<Mixer>, buffer_size: Duration) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!(device = device_name.as_str(), "using audio output device");

        let sample_rate = mixer.sample_rate();
        let config = StreamConfig {
            channels: CHANNEL_COUNT as u16,
            sample_rate: SampleRate(sample_rate),
            buffer_size: buffer_size_frames(buffer_size, sample_rate),
        };

        let cb_mixer = Arc::clone(&mixer);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Realtime thread: the mixer zeroes and sums in place.
                    cb_mixer.fill(data);
                },
                move |err| {
                    error!(error = %err, "audio output stream error");
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuild(format!("{e}")))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(format!("{e}")))?;

        debug!(
            sample_rate = sample_rate,
            channels = CHANNEL_COUNT,
            "audio output stream built"
        );

        Ok(Self { stream })
    }

    pub(crate) fn pause(&self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::Output(format!("{e}")))
    }

    pub(crate) fn play(&self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::StreamPlay(format!("{e}")))
    }
}

/// Convert the requested device buffer duration to a fixed cpal frame
/// count. Zero (and durations shorter than one frame) select the driver
/// default.
fn buffer_size_frames(buffer_size: Duration, sample_rate: u32) -> BufferSize {
    if buffer_size.is_zero() {
        return BufferSize::Default;
    }
    let frames = (buffer_size.as_secs_f64() * sample_rate as f64) as u32;
    if frames == 0 {
        BufferSize::Default
    } else {
        BufferSize::Fixed(frames)
    }
}
