//! Tone playback tool

use std::sync::Arc;

use async_trait::async_trait;

use super::Tool;
use crate::voice::AudioSink;
use crate::{Error, Result};

/// Plays a fixed sine tone
pub struct PlaySound {
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    frequency_hz: f32,
    duration_secs: f32,
    amplitude: f32,
}

impl PlaySound {
    /// A one-second 440 Hz beep at `sample_rate`
    #[must_use]
    pub fn new(sink: Arc<dyn AudioSink>, sample_rate: u32) -> Self {
        Self {
            sink,
            sample_rate,
            frequency_hz: 440.0,
            duration_secs: 1.0,
            amplitude: 0.5,
        }
    }

    /// Override the tone frequency and length
    #[must_use]
    pub const fn with_tone(mut self, frequency_hz: f32, duration_secs: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.duration_secs = duration_secs;
        self
    }
}

#[async_trait]
impl Tool for PlaySound {
    async fn execute(&self) -> Result<String> {
        let samples = generate_sine_wave(
            self.frequency_hz,
            self.duration_secs,
            self.amplitude,
            self.sample_rate,
        );

        self.sink
            .play(samples, self.sample_rate)
            .await
            .map_err(|e| Error::Tool(format!("failed to play sound: {e}")))?;

        Ok(format!(
            "played a {} Hz tone for {:.1} s",
            self.frequency_hz, self.duration_secs
        ))
    }
}

/// Generate a sine wave
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn generate_sine_wave(
    frequency: f32,
    duration_secs: f32,
    amplitude: f32,
    sample_rate: u32,
) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs.max(0.0)) as usize;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}
