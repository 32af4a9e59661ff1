//! Error types for edge-agent

use thiserror::Error;

/// Result type alias for edge-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in edge-agent
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Intent classifier error (transport, status or response shape)
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Tool execution error
    #[error("tool error: {0}")]
    Tool(String),

    /// Tool registered twice under the same name
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    /// Camera acquisition or capture error
    #[error("camera error: {0}")]
    Camera(String),

    /// Vision API error
    #[error("vision error: {0}")]
    Vision(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
