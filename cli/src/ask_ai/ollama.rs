use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    ask_ai::types::AnalysisRequest,
    error::{AnalystError, Result},
};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision";

/// A multimodal model that reads a chart image and answers in text.
///
/// Implementations make a single attempt; any failure is reported as
/// [`AnalystError::ModelUnavailable`].
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Ollama `/api/chat` client.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl VisionModel for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        let payload = ChatRequest {
            model: &self.model,
            stream: false,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.instruction,
                images: vec![request.image_base64.as_str()],
            }],
        };

        let response = self
            .client
            .post(self.chat_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalystError::ModelUnavailable(format!("{} timed out", self.model))
                } else {
                    AnalystError::ModelUnavailable(format!("cannot reach {}: {}", self.base_url, e))
                }
            })?;

        let status = response.status();
        let body: ChatResponse = response.json().await.map_err(|e| {
            AnalystError::ModelUnavailable(format!("unreadable response (HTTP {}): {}", status, e))
        })?;

        if let Some(error) = body.error {
            return Err(AnalystError::ModelUnavailable(format!("{}: {}", self.model, error)));
        }
        if !status.is_success() {
            return Err(AnalystError::ModelUnavailable(format!("HTTP {} from {}", status, self.model)));
        }

        body.message
            .map(|m| m.content)
            .ok_or_else(|| AnalystError::ModelUnavailable(format!("{} returned no message", self.model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_payload_shape() {
        let payload = ChatRequest {
            model: "llama3.2-vision",
            stream: false,
            messages: vec![ChatMessage {
                role: "user",
                content: "read this chart",
                images: vec!["aGVsbG8="],
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "llama3.2-vision");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["images"][0], "aGVsbG8=");
    }

    #[test]
    fn test_chat_response_parsing() {
        let ok: ChatResponse = serde_json::from_str(
            r#"{"model":"llama3.2-vision","message":{"role":"assistant","content":"HOLD. The trend is flat."},"done":true}"#,
        )
        .unwrap();
        assert_eq!(ok.message.unwrap().content, "HOLD. The trend is flat.");

        let err: ChatResponse = serde_json::from_str(r#"{"error":"model 'x' not found"}"#).unwrap();
        assert!(err.message.is_none());
        assert_eq!(err.error.as_deref(), Some("model 'x' not found"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_model_unavailable() {
        let client = OllamaClient::new("http://127.0.0.1:9/", DEFAULT_VISION_MODEL, Duration::from_secs(2)).unwrap();
        assert_eq!(client.chat_url(), "http://127.0.0.1:9/api/chat");

        let request = AnalysisRequest {
            instruction: "read this chart".to_string(),
            image_base64: "aGVsbG8=".to_string(),
        };
        let result = client.analyze(&request).await;
        assert!(matches!(result, Err(AnalystError::ModelUnavailable(_))));
    }
}
