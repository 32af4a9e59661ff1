//! Voice command capture: record, persist, transcribe

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::capture::{Recorder, samples_to_wav};
use super::stt::{Transcriber, Transcript};
use crate::Result;

/// Result of capturing one spoken command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Speech recognized as text
    Transcribed(String),
    /// Audio was recorded but no speech could be recognized
    Unintelligible,
    /// The microphone could not be opened or produced no audio
    CaptureError(String),
    /// The transcription service was unreachable or failed
    ServiceError(String),
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transcribed(text) => write!(f, "{text}"),
            Self::Unintelligible => write!(f, "could not understand audio"),
            Self::CaptureError(detail) => write!(f, "recording failed: {detail}"),
            Self::ServiceError(detail) => write!(f, "speech recognition service error: {detail}"),
        }
    }
}

/// Produces command text from a live recording
#[async_trait]
pub trait VoiceCapture: Send + Sync {
    /// Record and transcribe one command; never fails, see [`CaptureOutcome`]
    async fn capture(&self) -> CaptureOutcome;
}

/// Records a fixed-length clip from a [`Recorder`] and transcribes it
pub struct MicrophoneCapture {
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    duration: Duration,
    output_dir: Option<PathBuf>,
}

impl MicrophoneCapture {
    /// Create a capture adapter recording `duration` per command
    #[must_use]
    pub fn new(
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        duration: Duration,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            duration,
            output_dir: None,
        }
    }

    /// Keep a WAV copy of every recorded command in `dir`
    #[must_use]
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }
}

#[async_trait]
impl VoiceCapture for MicrophoneCapture {
    async fn capture(&self) -> CaptureOutcome {
        let samples = match self.recorder.record(self.duration).await {
            Ok(samples) if samples.is_empty() => {
                return CaptureOutcome::CaptureError("no audio captured".to_string());
            }
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, "recording failed");
                return CaptureOutcome::CaptureError(e.to_string());
            }
        };

        let wav = match samples_to_wav(&samples, self.recorder.sample_rate()) {
            Ok(wav) => wav,
            Err(e) => return CaptureOutcome::CaptureError(e.to_string()),
        };

        // Persistence is for auditing only and never blocks the command
        if let Some(dir) = &self.output_dir {
            match persist_recording(dir, "command", &wav).await {
                Ok(path) => tracing::debug!(path = %path.display(), "saved command recording"),
                Err(e) => tracing::warn!(error = %e, "failed to save command recording"),
            }
        }

        match self.transcriber.transcribe(&wav).await {
            Ok(Transcript::Text(text)) => {
                tracing::info!(text = %text, "recognized speech");
                CaptureOutcome::Transcribed(text)
            }
            Ok(Transcript::Unintelligible) => CaptureOutcome::Unintelligible,
            Err(e) => CaptureOutcome::ServiceError(e.to_string()),
        }
    }
}

/// Timestamp used in recording file names, e.g. `20240131_142501`
#[must_use]
pub fn recording_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write `wav` to `<dir>/<prefix>_<timestamp>.wav`
///
/// # Errors
///
/// Returns error if the file cannot be written
pub async fn persist_recording(dir: &Path, prefix: &str, wav: &[u8]) -> Result<PathBuf> {
    let path = dir.join(format!("{prefix}_{}.wav", recording_timestamp()));
    tokio::fs::write(&path, wav).await?;
    Ok(path)
}
