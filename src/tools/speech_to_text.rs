//! Speech transcription tool
//!
//! Records a clip, keeps both the WAV and the transcript on disk, and reports
//! where the transcript was written.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::Tool;
use crate::voice::{Recorder, Transcriber, Transcript, recording_timestamp, samples_to_wav};
use crate::{Error, Result};

/// Records speech and saves its transcript
pub struct SpeechToTextTool {
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    output_dir: PathBuf,
    duration: Duration,
}

impl SpeechToTextTool {
    /// Create the tool writing into `output_dir`
    #[must_use]
    pub fn new(
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        output_dir: PathBuf,
        duration: Duration,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            output_dir,
            duration,
        }
    }
}

#[async_trait]
impl Tool for SpeechToTextTool {
    async fn execute(&self) -> Result<String> {
        let samples = self.recorder.record(self.duration).await?;
        if samples.is_empty() {
            return Err(Error::Tool("no audio captured".to_string()));
        }

        let wav = samples_to_wav(&samples, self.recorder.sample_rate())?;

        let timestamp = recording_timestamp();
        let audio_file = self.output_dir.join(format!("recording_{timestamp}.wav"));
        let text_file = self.output_dir.join(format!("transcript_{timestamp}.txt"));

        tokio::fs::write(&audio_file, &wav).await?;
        tracing::debug!(path = %audio_file.display(), "saved recording");

        let text = match self.transcriber.transcribe(&wav).await? {
            Transcript::Text(text) => text,
            Transcript::Unintelligible => {
                return Err(Error::Tool("could not understand audio".to_string()));
            }
        };

        tokio::fs::write(&text_file, text.as_bytes()).await?;
        tracing::info!(path = %text_file.display(), "saved transcript");

        Ok(format!(
            "speech transcribed and saved to: {}",
            text_file.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRecorder(Vec<f32>);

    #[async_trait]
    impl Recorder for FixedRecorder {
        async fn record(&self, duration: Duration) -> Result<Vec<f32>> {
            assert_eq!(duration, Duration::from_secs(5));
            Ok(self.0.clone())
        }

        fn sample_rate(&self) -> u32 {
            16_000
        }
    }

    struct FixedTranscriber(Transcript);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _wav: &[u8]) -> Result<Transcript> {
            Ok(self.0.clone())
        }
    }

    fn tool(dir: PathBuf, samples: Vec<f32>, transcript: Transcript) -> SpeechToTextTool {
        SpeechToTextTool::new(
            Arc::new(FixedRecorder(samples)),
            Arc::new(FixedTranscriber(transcript)),
            dir,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_writes_recording_and_transcript() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let tool = tool(
            temp_dir.path().to_path_buf(),
            vec![0.2; 800],
            Transcript::Text("今天天氣很好".to_string()),
        );

        let result = tool.execute().await.unwrap();
        assert!(result.starts_with("speech transcribed and saved to: "));

        let mut names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("recording_") && names[0].ends_with(".wav"));
        assert!(names[1].starts_with("transcript_") && names[1].ends_with(".txt"));

        let transcript = std::fs::read_to_string(temp_dir.path().join(&names[1])).unwrap();
        assert_eq!(transcript, "今天天氣很好");
        assert!(result.contains(&names[1]));
    }

    #[tokio::test]
    async fn test_unintelligible_is_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let tool = tool(
            temp_dir.path().to_path_buf(),
            vec![0.0; 800],
            Transcript::Unintelligible,
        );

        let err = tool.execute().await.unwrap_err();
        assert!(err.to_string().contains("could not understand audio"));
    }

    #[tokio::test]
    async fn test_missing_output_dir_is_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let tool = tool(
            temp_dir.path().join("missing"),
            vec![0.2; 800],
            Transcript::Text("hello".to_string()),
        );

        assert!(matches!(tool.execute().await, Err(Error::Io(_))));
    }
}
