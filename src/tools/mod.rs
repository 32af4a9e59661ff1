//! Tools the router can dispatch to
//!
//! Every tool exposes a single no-argument async [`Tool::execute`] and is
//! registered together with a static [`ToolDescriptor`] that the intent
//! classifier sees.

mod count_people;
mod play_sound;
mod registry;
mod speech_to_text;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

pub use count_people::{
    Camera, CameraSession, CommandCamera, CountPeople, FaceBox, FaceDetector, Frame,
    VisionFaceDetector, overlap_ratio, parse_face_boxes, remove_duplicates,
    select_best_detections,
};
pub use play_sound::{PlaySound, generate_sine_wave};
pub use registry::ToolRegistry;
pub use speech_to_text::SpeechToTextTool;

use crate::Config;
use crate::Result;
use crate::voice::{MicrophoneRecorder, SpeakerSink, WhisperTranscriber};

/// Static metadata describing a registered tool
///
/// Keywords are context for the classifier only; lookups match on `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    /// Unique registry key returned by the classifier
    pub name: String,
    /// Example trigger phrases
    pub keywords: Vec<String>,
    /// Human description of what the tool does
    pub description: String,
    /// Opaque label echoed back to the caller (e.g. "Task1")
    #[serde(rename = "task")]
    pub task_label: String,
}

impl ToolDescriptor {
    /// Create a descriptor with no keywords
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        task_label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
            description: description.into(),
            task_label: task_label.into(),
        }
    }

    /// Attach trigger keywords
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// A registered capability
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool and describe what happened
    ///
    /// # Errors
    ///
    /// Returns error if the underlying device or service fails
    async fn execute(&self) -> Result<String>;
}

/// Descriptor for the tone playback tool
#[must_use]
pub fn play_sound_descriptor() -> ToolDescriptor {
    ToolDescriptor::new("play_sound", "Task1", "Plays a short tone on the speaker")
        .with_keywords(["播放喇叭", "播放聲音", "讓喇叭發聲", "播放", "聲音", "play sound", "beep"])
}

/// Descriptor for the speech transcription tool
#[must_use]
pub fn speech_to_text_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        "speech_to_text",
        "Task2",
        "Records speech and converts it to text",
    )
    .with_keywords(["STT", "語音轉文字", "轉換語音", "語音識別", "transcribe", "dictation"])
}

/// Descriptor for the camera people counter
#[must_use]
pub fn count_people_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        "count_people",
        "Task3",
        "Counts the people visible to the camera",
    )
    .with_keywords(["現場人數", "鏡頭中人數", "計算人數", "數人", "how many people", "count people"])
}

/// Build the registry of hardware-backed tools from configuration
///
/// # Errors
///
/// Returns error if a tool's service client cannot be created
pub fn builtin_registry(config: &Config) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(
        play_sound_descriptor(),
        Arc::new(PlaySound::new(Arc::new(SpeakerSink), config.audio.sample_rate)),
    )?;

    registry.register(
        speech_to_text_descriptor(),
        Arc::new(SpeechToTextTool::new(
            Arc::new(MicrophoneRecorder::new(config.audio.sample_rate)),
            Arc::new(WhisperTranscriber::new(&config.stt)?),
            config.audio.stt_output_dir.clone(),
            config.audio.stt_record_duration,
        )),
    )?;

    let detectors = config
        .camera
        .vision_models
        .iter()
        .map(|model| {
            VisionFaceDetector::new(&config.camera, model)
                .map(|d| Arc::new(d) as Arc<dyn FaceDetector>)
        })
        .collect::<Result<Vec<_>>>()?;

    registry.register(
        count_people_descriptor(),
        Arc::new(
            CountPeople::new(
                Arc::new(CommandCamera::new(
                    config.camera.capture_command.clone(),
                    config.camera.capture_timeout,
                )?),
                detectors,
            )
            .with_frames(config.camera.frames)
            .with_overlap_threshold(config.camera.overlap_threshold),
        ),
    )?;

    tracing::debug!(tools = ?registry.names(), "registered builtin tools");
    Ok(registry)
}
