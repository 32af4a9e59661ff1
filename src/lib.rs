//! edge-agent - Voice and text command router for edge devices
//!
//! This library provides the core functionality for edge-agent:
//! - Tool registry with static descriptors
//! - Intent classification via a hosted chat model
//! - Command routing with stage-tagged outcomes
//! - Microphone, speaker and camera adapters behind traits
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        Typed text   │   Microphone (STT)            │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Command Router                       │
//! │   Capture  │  Classify  │  Resolve  │  Execute      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Tool Registry                        │
//! │   play_sound  │  speech_to_text  │  count_people    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod tools;
pub mod voice;

pub use agent::{ChatClassifier, CommandOutcome, CommandRouter, IntentClassifier, Stage};
pub use config::Config;
pub use error::{Error, Result};
pub use tools::{Tool, ToolDescriptor, ToolRegistry};
