//! Face detection through a vision-capable chat completion API

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{FaceBox, FaceDetector, Frame};
use crate::config::CameraConfig;
use crate::{Error, Result};

const DETECTION_PROMPT: &str = "Detect every human face in this image. \
Respond with only a JSON array of bounding boxes in pixels, one object per face: \
[{\"x\":0,\"y\":0,\"width\":0,\"height\":0}]. Respond with [] if there are no faces.";

/// Face detector backed by one vision model
pub struct VisionFaceDetector {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

impl VisionFaceDetector {
    /// Create a detector for `model` using the camera's vision settings
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &CameraConfig, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.vision_timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.vision_base_url.trim_end_matches('/')
            ),
            api_key: config.vision_api_key(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl FaceDetector for VisionFaceDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<FaceBox>> {
        let base64_data = base64::engine::general_purpose::STANDARD.encode(&frame.data);
        let data_url = format!("data:{};base64,{base64_data}", frame.mime_type);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: DETECTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Vision(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Vision(format!("API error: {status} - {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Vision(format!("failed to parse response: {e}")))?;

        let content = result
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| Error::Vision("response has no message content".to_string()))?;

        let faces = parse_face_boxes(content)?;
        tracing::debug!(model = %self.model, faces = faces.len(), "vision detection complete");
        Ok(faces)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Extract the JSON array of face boxes from model output
///
/// Tolerates prose or code fences around the array.
///
/// # Errors
///
/// Returns error if no well-formed array is present
pub fn parse_face_boxes(content: &str) -> Result<Vec<FaceBox>> {
    let start = content.find('[');
    let end = content.rfind(']');

    let (Some(start), Some(end)) = (start, end) else {
        return Err(Error::Vision(format!("no face array in response: {content}")));
    };
    if end < start {
        return Err(Error::Vision(format!("no face array in response: {content}")));
    }

    serde_json::from_str(&content[start..=end])
        .map_err(|e| Error::Vision(format!("malformed face array: {e}")))
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let faces = parse_face_boxes(r#"[{"x":10,"y":20,"width":30,"height":40}]"#).unwrap();
        assert_eq!(faces, vec![FaceBox::new(10, 20, 30, 40)]);
    }

    #[test]
    fn test_parse_fenced_array() {
        let content = "Here you go:\n```json\n[\n  {\"x\":1,\"y\":2,\"width\":3,\"height\":4},\n  {\"x\":5,\"y\":6,\"width\":7,\"height\":8}\n]\n```";
        let faces = parse_face_boxes(content).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1], FaceBox::new(5, 6, 7, 8));
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_face_boxes("[]").unwrap().is_empty());
        assert!(parse_face_boxes("no faces here").is_err());
        assert!(parse_face_boxes("] backwards [").is_err());
        assert!(parse_face_boxes(r#"[{"x":"left"}]"#).is_err());
    }

    #[test]
    fn test_request_content_parts_are_tagged() {
        let part = ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: "data:image/jpeg;base64,AAAA".to_string(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"]["url"], "data:image/jpeg;base64,AAAA");
    }
}
