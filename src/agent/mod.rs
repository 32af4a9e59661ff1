//! Intent routing agent

mod classifier;
mod router;

pub use classifier::{ChatClassifier, IntentClassifier, build_prompt};
pub use router::{CommandOutcome, CommandRouter, Stage};
