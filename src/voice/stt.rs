//! Speech-to-text (STT) processing

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::SttConfig;
use crate::{Error, Result};

/// Outcome of a successful round-trip to the transcription service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized speech
    Text(String),
    /// The service answered but found no intelligible speech
    Unintelligible,
}

impl Transcript {
    /// Classify raw service text; blank text means nothing was understood
    #[must_use]
    pub fn from_service_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Unintelligible
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

/// Converts recorded audio to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if the service is unreachable or answers with a failure
    async fn transcribe(&self, wav: &[u8]) -> Result<Transcript>;
}

/// Response from an OpenAI-compatible transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech through an OpenAI-compatible `/audio/transcriptions` endpoint
pub struct WhisperTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    language: String,
}

impl WhisperTranscriber {
    /// Create a new transcriber from STT configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be built
    pub fn new(config: &SttConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for transcription".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/audio/transcriptions",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key(),
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<Transcript> {
        tracing::debug!(audio_bytes = wav.len(), language = %self.language, "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                if e.is_timeout() {
                    Error::Stt(format!("request timed out: {e}"))
                } else {
                    Error::Stt(format!("service unreachable: {e}"))
                }
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            Error::Stt(format!("malformed transcription response: {e}"))
        })?;

        let transcript = Transcript::from_service_text(&result.text);
        match &transcript {
            Transcript::Text(text) => tracing::info!(transcript = %text, "transcription complete"),
            Transcript::Unintelligible => tracing::info!("no intelligible speech"),
        }
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_unintelligible() {
        assert_eq!(Transcript::from_service_text(""), Transcript::Unintelligible);
        assert_eq!(
            Transcript::from_service_text("  \n"),
            Transcript::Unintelligible
        );
        assert_eq!(
            Transcript::from_service_text(" 播放聲音 "),
            Transcript::Text("播放聲音".to_string())
        );
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = SttConfig {
            base_url: "http://localhost".to_string(),
            model: "whisper-1".to_string(),
            language: "zh".to_string(),
            api_key: SecretString::from(String::new()),
            timeout: std::time::Duration::from_secs(30),
        };
        assert!(matches!(
            WhisperTranscriber::new(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = SttConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            model: "whisper-1".to_string(),
            language: "en".to_string(),
            api_key: SecretString::from("k".to_string()),
            timeout: std::time::Duration::from_secs(30),
        };
        let transcriber = WhisperTranscriber::new(&config).unwrap();
        assert_eq!(
            transcriber.endpoint,
            "http://localhost:9000/v1/audio/transcriptions"
        );
    }
}
