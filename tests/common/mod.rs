//! Shared test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use edge_agent::tools::{
    ToolRegistry, count_people_descriptor, play_sound_descriptor, speech_to_text_descriptor,
};
use edge_agent::voice::{CaptureOutcome, VoiceCapture};
use edge_agent::{Error, IntentClassifier, Result, Tool, ToolDescriptor};

/// Classifier returning a fixed answer and recording what it was asked
pub struct StubClassifier {
    answer: std::result::Result<String, String>,
    calls: AtomicUsize,
    utterances: Mutex<Vec<String>>,
    catalogs: Mutex<Vec<Vec<ToolDescriptor>>>,
}

impl StubClassifier {
    /// Always answer `name`
    pub fn answering(name: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(name.to_string()),
            calls: AtomicUsize::new(0),
            utterances: Mutex::new(Vec::new()),
            catalogs: Mutex::new(Vec::new()),
        })
    }

    /// Always fail with `message`
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            utterances: Mutex::new(Vec::new()),
            catalogs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn utterances(&self) -> Vec<String> {
        self.utterances.lock().unwrap().clone()
    }

    pub fn catalogs(&self) -> Vec<Vec<ToolDescriptor>> {
        self.catalogs.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentClassifier for StubClassifier {
    async fn classify(&self, catalog: &[ToolDescriptor], utterance: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.utterances.lock().unwrap().push(utterance.to_string());
        self.catalogs.lock().unwrap().push(catalog.to_vec());
        self.answer.clone().map_err(Error::Classifier)
    }
}

/// Tool returning fixed text and counting invocations
pub struct StubTool {
    text: String,
    calls: AtomicUsize,
}

impl StubTool {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StubTool {
    async fn execute(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Tool that always fails
pub struct FailingTool(pub &'static str);

#[async_trait]
impl Tool for FailingTool {
    async fn execute(&self) -> Result<String> {
        Err(Error::Tool(self.0.to_string()))
    }
}

/// Tool that panics
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    async fn execute(&self) -> Result<String> {
        panic!("speaker driver crashed");
    }
}

/// Voice capture returning a fixed outcome
pub struct StubCapture(pub CaptureOutcome);

#[async_trait]
impl VoiceCapture for StubCapture {
    async fn capture(&self) -> CaptureOutcome {
        self.0.clone()
    }
}

/// The three built-in descriptors, each backed by its own tool
pub fn builtin_catalog(
    play_sound: Arc<dyn Tool>,
    speech_to_text: Arc<dyn Tool>,
    count_people: Arc<dyn Tool>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(play_sound_descriptor(), play_sound)
        .expect("register play_sound");
    registry
        .register(speech_to_text_descriptor(), speech_to_text)
        .expect("register speech_to_text");
    registry
        .register(count_people_descriptor(), count_people)
        .expect("register count_people");
    registry
}
