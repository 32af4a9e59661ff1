//! Command router: receive, classify, resolve, execute
//!
//! Every failure is reported as a [`CommandOutcome::Failure`] tagged with the
//! stage it happened in; nothing here returns `Result`.

use std::fmt;
use std::sync::Arc;

use super::classifier::IntentClassifier;
use crate::tools::ToolRegistry;
use crate::voice::{CaptureOutcome, VoiceCapture};

/// Pipeline stage a command failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Recording or transcribing a voice command
    Capture,
    /// Asking the classifier for a tool name
    Classify,
    /// Looking the tool name up in the registry
    Resolve,
    /// Running the tool
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Capture => "capture",
            Self::Classify => "classify",
            Self::Resolve => "resolve",
            Self::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Result of routing one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The tool ran and reported back
    Success {
        tool_name: String,
        task_label: String,
        result_text: String,
    },
    /// The command stopped at `stage`
    Failure { stage: Stage, message: String },
}

impl CommandOutcome {
    fn failure(stage: Stage, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(%stage, %message, "command failed");
        Self::Failure { stage, message }
    }

    /// Whether the tool ran successfully
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failing stage, if any
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { stage, .. } => Some(*stage),
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                task_label,
                result_text,
                ..
            } => write!(f, "recognized as {task_label}, result: {result_text}"),
            Self::Failure { message, .. } => f.write_str(message),
        }
    }
}

/// Routes text and voice commands to registered tools
pub struct CommandRouter {
    registry: Arc<ToolRegistry>,
    classifier: Arc<dyn IntentClassifier>,
    voice: Option<Arc<dyn VoiceCapture>>,
}

impl CommandRouter {
    /// Create a router over `registry`
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            registry,
            classifier,
            voice: None,
        }
    }

    /// Enable voice commands
    #[must_use]
    pub fn with_voice_capture(mut self, voice: Arc<dyn VoiceCapture>) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Registry the router dispatches into
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Process a typed command and describe the outcome
    pub async fn process_text_command(&self, text: &str) -> String {
        self.route_text(text).await.to_string()
    }

    /// Record, process and describe a spoken command
    pub async fn process_voice_command(&self) -> String {
        self.route_voice().await.to_string()
    }

    /// Record a spoken command and route its transcript
    pub async fn route_voice(&self) -> CommandOutcome {
        let Some(voice) = &self.voice else {
            return CommandOutcome::failure(
                Stage::Capture,
                "recording failed: voice input is not configured",
            );
        };

        tracing::info!("capturing voice command");
        match voice.capture().await {
            CaptureOutcome::Transcribed(text) => {
                tracing::info!(text = %text, "voice command transcribed");
                self.route_text(&text).await
            }
            other => CommandOutcome::failure(Stage::Capture, other.to_string()),
        }
    }

    /// Classify, resolve and execute a typed command
    pub async fn route_text(&self, text: &str) -> CommandOutcome {
        tracing::info!(text = %text, "command received");

        let catalog = self.registry.snapshot();
        let name = match self.classifier.classify(&catalog, text).await {
            Ok(name) => name,
            Err(e) => {
                return CommandOutcome::failure(
                    Stage::Classify,
                    format!("command processing failed: {e}"),
                );
            }
        };
        tracing::info!(tool = %name, "command classified");

        let (Some(tool), Some(descriptor)) =
            (self.registry.resolve(&name), self.registry.descriptor(&name))
        else {
            tracing::debug!(tool = %name, "classifier answer is not a registered tool");
            return CommandOutcome::failure(
                Stage::Resolve,
                format!("could not understand command: {text}"),
            );
        };
        let task_label = descriptor.task_label.clone();

        tracing::info!(tool = %name, task = %task_label, "executing tool");
        match tokio::spawn(async move { tool.execute().await }).await {
            Ok(Ok(result_text)) => {
                tracing::info!(tool = %name, "tool finished");
                CommandOutcome::Success {
                    tool_name: name,
                    task_label,
                    result_text,
                }
            }
            Ok(Err(e)) => {
                CommandOutcome::failure(Stage::Execute, format!("tool `{name}` failed: {e}"))
            }
            Err(join) if join.is_panic() => {
                CommandOutcome::failure(Stage::Execute, format!("tool `{name}` panicked"))
            }
            Err(join) => CommandOutcome::failure(
                Stage::Execute,
                format!("tool `{name}` was cancelled: {join}"),
            ),
        }
    }
}
