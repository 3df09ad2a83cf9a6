//! Multimodal inference client: Google Gemini `generateContent`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::GeminiConfig;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("prompt blocked by safety filter: {reason}")]
    Blocked { reason: String },

    #[error("no text in response")]
    EmptyReply,
}

/// Finish reasons Gemini uses when it refuses the content itself.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

/// One text+image prompt, answered once.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub instruction: String,
    pub image_mime_type: String,
    /// Canonical base64, no data-URL prefix.
    pub image_base64: String,
    pub response_schema: Option<Value>,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Returns the model's reply text.
    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn payload(&self, request: &InferenceRequest) -> Value {
        let mut generation_config = serde_json::json!({
            "responseMimeType": "application/json",
            "maxOutputTokens": self.config.max_output_tokens,
        });
        if let Some(schema) = &request.response_schema {
            generation_config["responseSchema"] = schema.clone();
        }

        serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": request.instruction },
                    {
                        "inline_data": {
                            "mime_type": request.image_mime_type,
                            "data": request.image_base64
                        }
                    }
                ]
            }],
            "generationConfig": generation_config
        })
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        info!(model = %self.config.model, "sending image to Gemini");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.payload(request))
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!(%status, body = %excerpt(&response_text), "Gemini response");

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let result: Value = serde_json::from_str(&response_text)?;

        if let Some(reason) = result["promptFeedback"]["blockReason"].as_str() {
            return Err(InferenceError::Blocked {
                reason: reason.to_string(),
            });
        }

        let candidate = &result["candidates"][0];
        let Some(text) = candidate["content"]["parts"][0]["text"].as_str() else {
            return Err(match candidate["finishReason"].as_str() {
                Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => {
                    InferenceError::Blocked {
                        reason: reason.to_string(),
                    }
                }
                _ => InferenceError::EmptyReply,
            });
        };
        let reply = text.to_string();

        info!(chars = reply.len(), "Gemini replied");
        Ok(reply)
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(500) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
            base_url: format!("{}/v1beta/", server.uri()),
            max_output_tokens: 1500,
        })
    }

    fn request() -> InferenceRequest {
        InferenceRequest {
            instruction: "analise".to_string(),
            image_mime_type: "image/png".to_string(),
            image_base64: "iVBORw0KGgo=".to_string(),
            response_schema: Some(json!({ "type": "OBJECT" })),
        }
    }

    #[tokio::test]
    async fn returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [
                    { "text": "analise" },
                    { "inline_data": { "mime_type": "image/png", "data": "iVBORw0KGgo=" } }
                ]}],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "maxOutputTokens": 1500,
                    "responseSchema": { "type": "OBJECT" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"ok\":true}" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).generate(&request()).await.unwrap();
        assert_eq!(reply, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn missing_candidate_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::EmptyReply));
    }

    #[tokio::test]
    async fn blocked_prompt_is_reported_as_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn safety_finish_without_content_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY", "index": 0 }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn non_json_body_keeps_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
        assert!(err.to_string().starts_with("response body is not JSON"));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let long = "é".repeat(600);
        assert_eq!(excerpt(&long).chars().count(), 500);
        assert_eq!(excerpt("curto"), "curto");
    }
}
