//! Configuration management for edge-agent
//!
//! Priority, lowest to highest: built-in defaults, the TOML config file,
//! environment variables. Only the classifier API key is required.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use self::file::AgentConfigFile;
use crate::{Error, Result};

/// Default OpenAI-compatible classifier endpoint
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default classifier model
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";

/// Default recording and playback sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default OpenAI-compatible endpoint for transcription and vision
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// edge-agent configuration
#[derive(Debug)]
pub struct Config {
    /// Intent classifier configuration
    pub llm: LlmConfig,

    /// Transcription service configuration
    pub stt: SttConfig,

    /// Recording and output configuration
    pub audio: AudioConfig,

    /// Camera and face detection configuration
    pub camera: CameraConfig,
}

/// Intent classifier configuration
#[derive(Debug)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Bearer token
    pub api_key: SecretString,

    /// Upper bound on a single classification round-trip
    pub timeout: Duration,
}

/// Transcription service configuration
#[derive(Debug)]
pub struct SttConfig {
    /// Base URL; `/audio/transcriptions` is appended
    pub base_url: String,

    /// Transcription model (e.g. "whisper-1")
    pub model: String,

    /// Spoken language hint (ISO 639-1)
    pub language: String,

    /// Bearer token
    pub api_key: SecretString,

    /// Upper bound on a single transcription upload
    pub timeout: Duration,
}

/// Audio recording configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate for recording and playback
    pub sample_rate: u32,

    /// Voice command recording length
    pub record_duration: Duration,

    /// `speech_to_text` tool recording length
    pub stt_record_duration: Duration,

    /// Directory for recorded voice commands
    pub output_dir: PathBuf,

    /// Directory for `speech_to_text` recordings and transcripts
    pub stt_output_dir: PathBuf,
}

/// Camera and face detection configuration
#[derive(Debug)]
pub struct CameraConfig {
    /// Still-capture command; first element is the program
    pub capture_command: Vec<String>,

    /// Frames sampled per count
    pub frames: usize,

    /// Overlap ratio above which two boxes are the same face
    pub overlap_threshold: f32,

    /// Capture command timeout
    pub capture_timeout: Duration,

    /// Vision API base URL
    pub vision_base_url: String,

    /// One detector per model
    pub vision_models: Vec<String>,

    /// Vision API bearer token
    pub vision_api_key: SecretString,

    /// Upper bound on a single detection request
    pub vision_timeout: Duration,
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if the classifier API key is not configured
    pub fn load() -> Result<Self> {
        let file = file::load_config_file();
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if the classifier API key is not configured or a
    /// numeric setting is out of range
    pub fn from_sources<F>(file: AgentConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, fallback: Option<String>| {
            env(key).filter(|v| !v.is_empty()).or(fallback)
        };

        let llm_key = env_or("EDGE_AGENT_LLM_API_KEY", None)
            .or_else(|| env_or("DEEPSEEK_API_KEY", file.llm.api_key.clone()))
            .ok_or_else(|| {
                Error::Config(
                    "classifier API key not set (DEEPSEEK_API_KEY or EDGE_AGENT_LLM_API_KEY)"
                        .to_string(),
                )
            })?;

        let llm = LlmConfig {
            base_url: env_or("EDGE_AGENT_LLM_BASE_URL", file.llm.base_url)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: env_or("EDGE_AGENT_LLM_MODEL", file.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: SecretString::from(llm_key.clone()),
            timeout: timeout_from(
                "EDGE_AGENT_LLM_TIMEOUT_SECS",
                env_or("EDGE_AGENT_LLM_TIMEOUT_SECS", None),
                file.llm.timeout_secs,
                30,
            )?,
        };

        // Transcription falls back to the classifier key for single-provider setups
        let stt_key = env_or("OPENAI_API_KEY", file.stt.api_key).unwrap_or(llm_key);
        let stt = SttConfig {
            base_url: env_or("EDGE_AGENT_STT_BASE_URL", file.stt.base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: env_or("EDGE_AGENT_STT_MODEL", file.stt.model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            language: env_or("EDGE_AGENT_STT_LANGUAGE", file.stt.language)
                .unwrap_or_else(|| "zh".to_string()),
            api_key: SecretString::from(stt_key.clone()),
            timeout: timeout_from(
                "EDGE_AGENT_STT_TIMEOUT_SECS",
                env_or("EDGE_AGENT_STT_TIMEOUT_SECS", None),
                file.stt.timeout_secs,
                30,
            )?,
        };

        let sample_rate = env_or("EDGE_AGENT_SAMPLE_RATE", None)
            .map(|v| parse_number::<u32>("EDGE_AGENT_SAMPLE_RATE", &v))
            .transpose()?
            .or(file.audio.sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE);
        if sample_rate == 0 {
            return Err(Error::Config("sample rate must be positive".to_string()));
        }

        let record_secs = env_or("EDGE_AGENT_RECORD_SECS", None)
            .map(|v| parse_number::<f32>("EDGE_AGENT_RECORD_SECS", &v))
            .transpose()?
            .or(file.audio.record_secs)
            .unwrap_or(3.0);
        let stt_record_secs = file.audio.stt_record_secs.unwrap_or(5.0);

        let output_root = env_or("EDGE_AGENT_OUTPUT_DIR", None)
            .map_or_else(default_output_dir, PathBuf::from);

        let audio = AudioConfig {
            sample_rate,
            record_duration: recording_duration("record_secs", record_secs)?,
            stt_record_duration: recording_duration("stt_record_secs", stt_record_secs)?,
            output_dir: file
                .audio
                .output_dir
                .map_or_else(|| output_root.join("audio"), PathBuf::from),
            stt_output_dir: file
                .audio
                .stt_output_dir
                .map_or_else(|| output_root.join("stt"), PathBuf::from),
        };

        let capture_command = env_or("EDGE_AGENT_CAMERA_COMMAND", None)
            .map(|v| v.split_whitespace().map(ToString::to_string).collect())
            .or(file.camera.capture_command)
            .filter(|c: &Vec<String>| !c.is_empty())
            .unwrap_or_else(default_capture_command);

        let vision_models = env_or("EDGE_AGENT_VISION_MODELS", None)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .or(file.camera.vision_models)
            .filter(|m: &Vec<String>| !m.is_empty())
            .unwrap_or_else(|| vec!["gpt-4o-mini".to_string()]);

        let camera = CameraConfig {
            capture_command,
            frames: file.camera.frames.unwrap_or(3).max(1),
            overlap_threshold: file.camera.overlap_threshold.unwrap_or(0.3),
            capture_timeout: Duration::from_secs(file.camera.capture_timeout_secs.unwrap_or(10)),
            vision_base_url: env_or("EDGE_AGENT_VISION_BASE_URL", file.camera.vision_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            vision_models,
            vision_api_key: SecretString::from(
                file.camera.vision_api_key.unwrap_or(stt_key),
            ),
            vision_timeout: timeout_from(
                "EDGE_AGENT_VISION_TIMEOUT_SECS",
                env_or("EDGE_AGENT_VISION_TIMEOUT_SECS", None),
                file.camera.vision_timeout_secs,
                60,
            )?,
        };

        Ok(Self {
            llm,
            stt,
            audio,
            camera,
        })
    }

    /// Create the output directories
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be created
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.audio.output_dir, &self.audio.stt_output_dir] {
            std::fs::create_dir_all(dir)?;
            tracing::debug!(path = %dir.display(), "output directory ready");
        }
        Ok(())
    }
}

impl LlmConfig {
    /// Copy of the API key for a client that owns its credentials
    #[must_use]
    pub fn api_key(&self) -> SecretString {
        SecretString::from(self.api_key.expose_secret().to_string())
    }
}

impl SttConfig {
    /// Copy of the API key for a client that owns its credentials
    #[must_use]
    pub fn api_key(&self) -> SecretString {
        SecretString::from(self.api_key.expose_secret().to_string())
    }
}

impl CameraConfig {
    /// Copy of the vision API key
    #[must_use]
    pub fn vision_api_key(&self) -> SecretString {
        SecretString::from(self.vision_api_key.expose_secret().to_string())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} is not a valid number: {value}")))
}

/// Request timeout from the environment, then the file, then `default_secs`
///
/// Never shorter than one second.
fn timeout_from(
    key: &str,
    env_value: Option<String>,
    file_value: Option<u64>,
    default_secs: u64,
) -> Result<Duration> {
    let secs = env_value
        .map(|v| parse_number::<u64>(key, &v))
        .transpose()?
        .or(file_value)
        .unwrap_or(default_secs);
    Ok(Duration::from_secs(secs.max(1)))
}

/// Convert a recording length, rejecting zero, negative, NaN and overflowing values
fn recording_duration(name: &str, secs: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::Config(format!("{name} must be a positive duration, got {secs}")))
}

/// Return the data directory for recordings, e.g. `~/.local/share/edge-agent`
fn default_output_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "edge-agent", "edge-agent")
        .map_or_else(|| PathBuf::from("output"), |d| d.data_dir().to_path_buf())
}

/// Pick a still-capture command for the current board
fn default_capture_command() -> Vec<String> {
    let command = if is_raspberry_pi(Path::new("/sys/firmware/devicetree/base/model")) {
        "libcamera-still -n -t 1 --width 640 --height 480 -e jpg -o -"
    } else {
        "ffmpeg -loglevel error -f v4l2 -video_size 640x480 -i /dev/video0 -frames:v 1 -f image2 -vcodec mjpeg -"
    };
    command.split_whitespace().map(ToString::to_string).collect()
}

/// Check the device-tree model string for a Raspberry Pi
fn is_raspberry_pi(model_path: &Path) -> bool {
    std::fs::read_to_string(model_path).is_ok_and(|model| model.contains("Raspberry Pi"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let err = Config::from_sources(AgentConfigFile::default(), env_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(
            AgentConfigFile::default(),
            env_from(&[("DEEPSEEK_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.record_duration, Duration::from_secs(3));
        assert_eq!(config.audio.stt_record_duration, Duration::from_secs(5));
        assert_eq!(config.stt.timeout, Duration::from_secs(30));
        assert_eq!(config.camera.vision_timeout, Duration::from_secs(60));
        assert_eq!(config.stt.language, "zh");
        // STT and vision reuse the classifier key when nothing else is set
        assert_eq!(config.stt.api_key.expose_secret(), "sk-test");
        assert_eq!(config.camera.vision_api_key.expose_secret(), "sk-test");
        assert_eq!(config.camera.frames, 3);
        assert!(!config.camera.capture_command.is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let file: AgentConfigFile = toml::from_str(
            r#"
            [llm]
            model = "from-file"
            base_url = "http://file.example/v1"
            api_key = "file-key"

            [audio]
            sample_rate = 16000
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            file,
            env_from(&[
                ("EDGE_AGENT_LLM_MODEL", "from-env"),
                ("EDGE_AGENT_SAMPLE_RATE", "22050"),
                ("EDGE_AGENT_OUTPUT_DIR", "/tmp/edge-agent-out"),
                ("EDGE_AGENT_VISION_MODELS", "a, b ,,c"),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "from-env");
        assert_eq!(config.llm.base_url, "http://file.example/v1");
        assert_eq!(config.llm.api_key.expose_secret(), "file-key");
        assert_eq!(config.audio.sample_rate, 22_050);
        assert_eq!(
            config.audio.output_dir,
            PathBuf::from("/tmp/edge-agent-out/audio")
        );
        assert_eq!(config.camera.vision_models, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = Config::from_sources(
            AgentConfigFile::default(),
            env_from(&[("DEEPSEEK_API_KEY", "k"), ("EDGE_AGENT_SAMPLE_RATE", "fast")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_out_of_range_recording_length_is_config_error() {
        for value in ["1e30", "-2", "0", "NaN", "inf"] {
            let err = Config::from_sources(
                AgentConfigFile::default(),
                env_from(&[("DEEPSEEK_API_KEY", "k"), ("EDGE_AGENT_RECORD_SECS", value)]),
            )
            .unwrap_err();
            assert!(matches!(err, Error::Config(_)), "accepted {value}");
        }

        let file: AgentConfigFile = toml::from_str("[audio]\nstt_record_secs = 1e30").unwrap();
        let err = Config::from_sources(file, env_from(&[("DEEPSEEK_API_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("stt_record_secs"));
    }

    #[test]
    fn test_service_timeouts_from_file_and_env() {
        let file: AgentConfigFile = toml::from_str(
            r#"
            [stt]
            timeout_secs = 12

            [camera]
            vision_timeout_secs = 45
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            file,
            env_from(&[
                ("DEEPSEEK_API_KEY", "k"),
                ("EDGE_AGENT_VISION_TIMEOUT_SECS", "0"),
                ("EDGE_AGENT_LLM_TIMEOUT_SECS", "7"),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.timeout, Duration::from_secs(7));
        assert_eq!(config.stt.timeout, Duration::from_secs(12));
        // Clamped to one second
        assert_eq!(config.camera.vision_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_ensure_dirs_creates_output_directories() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path().join("out");
        let config = Config::from_sources(
            AgentConfigFile::default(),
            env_from(&[
                ("DEEPSEEK_API_KEY", "k"),
                ("EDGE_AGENT_OUTPUT_DIR", root.to_str().unwrap()),
            ]),
        )
        .unwrap();

        config.ensure_dirs().unwrap();
        assert!(root.join("audio").is_dir());
        assert!(root.join("stt").is_dir());
    }

    #[test]
    fn test_raspberry_pi_detection() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let model = temp_dir.path().join("model");
        std::fs::write(&model, "Raspberry Pi 4 Model B Rev 1.4\0").unwrap();
        assert!(is_raspberry_pi(&model));

        std::fs::write(&model, "Generic x86 board").unwrap();
        assert!(!is_raspberry_pi(&model));
        assert!(!is_raspberry_pi(&temp_dir.path().join("missing")));
    }
}
