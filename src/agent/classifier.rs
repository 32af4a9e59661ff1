//! Intent classification through a chat completion API

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::LlmConfig;
use crate::tools::ToolDescriptor;
use crate::{Error, Result};

const INSTRUCTION: &str = "Return only the tool name, with no other explanation.";

/// Maps an utterance to the name of one catalog entry
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Pick a tool for `utterance` from `catalog`
    ///
    /// The returned name is not validated; callers resolve it against the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns error if the classifier cannot be reached or answers with an
    /// unexpected shape
    async fn classify(&self, catalog: &[ToolDescriptor], utterance: &str) -> Result<String>;
}

/// Classifier backed by an OpenAI-compatible chat completion endpoint
pub struct ChatClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl ChatClassifier {
    /// Create a classifier from LLM configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key(),
        })
    }

    /// Model used for classification
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl IntentClassifier for ChatClassifier {
    async fn classify(&self, catalog: &[ToolDescriptor], utterance: &str) -> Result<String> {
        let prompt = build_prompt(catalog, utterance)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        tracing::debug!(model = %self.model, tools = catalog.len(), "classifying command");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Classifier(format!("request timed out: {e}"))
                } else {
                    Error::Classifier(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Classifier(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Error::Classifier(format!("API error: {status} - {body}")));
        }

        let name = extract_content(&body)?;
        tracing::debug!(tool = %name, "classifier answered");
        Ok(name)
    }
}

/// Build the classification prompt
///
/// The catalog is embedded as a JSON array in registry order.
///
/// # Errors
///
/// Returns error if the catalog cannot be serialized
pub fn build_prompt(catalog: &[ToolDescriptor], utterance: &str) -> Result<String> {
    let tools = serde_json::to_string_pretty(catalog)?;
    Ok(format!(
        "You route user commands to tools. Available tools:\n{tools}\n\n\
         User command: {utterance}\n\n{INSTRUCTION}"
    ))
}

/// Pull `choices[0].message.content` out of a chat completion body
fn extract_content(body: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::Classifier(format!("invalid JSON response ({e}): {body}")))?;

    let choice = value
        .get("choices")
        .and_then(serde_json::Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            Error::Classifier(format!("response has no choices[0]: {body}"))
        })?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            Error::Classifier(format!(
                "choices[0].message.content is missing or not a string: {body}"
            ))
        })?;

    Ok(content.trim().to_string())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{count_people_descriptor, play_sound_descriptor, speech_to_text_descriptor};

    #[test]
    fn test_prompt_lists_catalog_in_order() {
        let catalog = vec![
            play_sound_descriptor(),
            speech_to_text_descriptor(),
            count_people_descriptor(),
        ];
        let prompt = build_prompt(&catalog, "幫我數一下人").unwrap();

        let play = prompt.find("\"play_sound\"").unwrap();
        let stt = prompt.find("\"speech_to_text\"").unwrap();
        let count = prompt.find("\"count_people\"").unwrap();
        assert!(play < stt && stt < count);

        assert!(prompt.contains("\"task\": \"Task3\""));
        assert!(prompt.contains("幫我數一下人"));
        assert!(prompt.ends_with(INSTRUCTION));
    }

    #[test]
    fn test_prompt_allows_empty_utterance() {
        let prompt = build_prompt(&[], "").unwrap();
        assert!(prompt.contains("[]"));
        assert!(prompt.contains("User command: \n"));
    }

    #[test]
    fn test_extract_content_trims() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  play_sound\n"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "play_sound");
    }

    #[test]
    fn test_extract_content_shape_errors() {
        let no_choices = extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(no_choices.to_string().contains("choices[0]"));

        let missing = extract_content(r#"{"id":"x"}"#).unwrap_err();
        assert!(missing.to_string().contains("choices[0]"));

        let not_string =
            extract_content(r#"{"choices":[{"message":{"content":42}}]}"#).unwrap_err();
        assert!(not_string.to_string().contains("not a string"));

        let garbage = extract_content("<html>bad gateway</html>").unwrap_err();
        assert!(garbage.to_string().contains("bad gateway"));
    }
}
