//! TOML configuration file loading
//!
//! Supports `~/.config/edge-agent/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AgentConfigFile {
    /// Intent classifier (chat completion) configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Transcription service configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Recording and output configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Camera and face detection configuration
    #[serde(default)]
    pub camera: CameraFileConfig,
}

/// Classifier service configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Base URL of an OpenAI-compatible API (e.g. `https://api.deepseek.com/v1`)
    pub base_url: Option<String>,

    /// Model identifier (e.g. "deepseek-chat")
    pub model: Option<String>,

    /// API key; prefer the environment for secrets
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Transcription service configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Spoken language hint (ISO 639-1, e.g. "zh")
    pub language: Option<String>,
    pub api_key: Option<String>,

    /// Upload timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Audio recording configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Sample rate in Hz for recording and tone playback
    pub sample_rate: Option<u32>,

    /// Duration of a voice command recording in seconds
    pub record_secs: Option<f32>,

    /// Duration of a `speech_to_text` tool recording in seconds
    pub stt_record_secs: Option<f32>,

    /// Directory for recorded voice commands
    pub output_dir: Option<String>,

    /// Directory for `speech_to_text` recordings and transcripts
    pub stt_output_dir: Option<String>,
}

/// Camera configuration
#[derive(Debug, Default, Deserialize)]
pub struct CameraFileConfig {
    /// Still-capture command writing one encoded image to stdout
    pub capture_command: Option<Vec<String>>,

    /// Frames sampled per count
    pub frames: Option<usize>,

    /// Overlap ratio above which two face boxes count as one face
    pub overlap_threshold: Option<f32>,

    /// Capture command timeout in seconds
    pub capture_timeout_secs: Option<u64>,

    /// Base URL of the vision-capable chat completion API
    pub vision_base_url: Option<String>,

    /// One face detector per model
    pub vision_models: Option<Vec<String>>,

    pub vision_api_key: Option<String>,

    /// Detection request timeout in seconds
    pub vision_timeout_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AgentConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AgentConfigFile {
    let Some(path) = config_file_path() else {
        return AgentConfigFile::default();
    };

    if !path.exists() {
        return AgentConfigFile::default();
    }

    load_config_file_from(&path)
}

/// Parse config file contents
///
/// # Errors
///
/// Returns `Error::Toml` if the contents are not a valid config file
pub fn parse_config_file(content: &str) -> Result<AgentConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load a TOML config file from an explicit path
///
/// Parse and read failures are logged and fall back to defaults.
pub fn load_config_file_from(path: &Path) -> AgentConfigFile {
    match std::fs::read_to_string(path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AgentConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AgentConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/edge-agent/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("edge-agent").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let content = r#"
            [llm]
            model = "deepseek-reasoner"

            [camera]
            vision_models = ["gpt-4o-mini", "gpt-4o"]
        "#;

        let config: AgentConfigFile = toml::from_str(content).unwrap();
        assert_eq!(config.llm.model.as_deref(), Some("deepseek-reasoner"));
        assert!(config.llm.base_url.is_none());
        assert_eq!(config.camera.vision_models.unwrap().len(), 2);
        assert!(config.audio.sample_rate.is_none());
    }

    #[test]
    fn test_invalid_contents_are_toml_error() {
        let err = parse_config_file("[audio]\nsample_rate = \"fast\"").unwrap_err();
        assert!(matches!(err, crate::Error::Toml(_)));
        assert!(err.to_string().starts_with("toml error: "));

        let config = parse_config_file("[stt]\ntimeout_secs = 15").unwrap();
        assert_eq!(config.stt.timeout_secs, Some(15));
    }

    #[test]
    fn test_unreadable_file_falls_back_to_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "this is [not toml").unwrap();

        let config = load_config_file_from(&path);
        assert!(config.llm.model.is_none());

        let missing = load_config_file_from(&temp_dir.path().join("missing.toml"));
        assert!(missing.stt.language.is_none());
    }
}
