//! Outbound mail through an HTTP mail relay.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;
use crate::image_data;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Delivers one message. Returns the relay's message id when it reports one.
    async fn send(&self, mail: &OutgoingMail) -> Result<Option<String>, RelayError>;
}

#[derive(Serialize)]
struct WireAttachment<'a> {
    filename: &'a str,
    content: String,
    content_type: &'a str,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<WireAttachment<'a>>,
}

impl<'a> From<&'a OutgoingMail> for WireMessage<'a> {
    fn from(mail: &'a OutgoingMail) -> Self {
        Self {
            from: &mail.from,
            to: [mail.to.as_str()],
            subject: &mail.subject,
            html: &mail.html,
            attachments: mail
                .attachments
                .iter()
                .map(|a| WireAttachment {
                    filename: &a.filename,
                    content: image_data::encode(&a.content),
                    content_type: &a.content_type,
                })
                .collect(),
        }
    }
}

/// Relay speaking the common `POST /emails` JSON dialect with a bearer credential.
pub struct HttpMailRelay {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpMailRelay {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.relay_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl MailRelay for HttpMailRelay {
    async fn send(&self, mail: &OutgoingMail) -> Result<Option<String>, RelayError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&WireMessage::from(mail))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["id"].as_str().map(str::to_string));
        info!(id = ?id, attachments = mail.attachments.len(), "mail accepted by relay");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relay(server: &MockServer) -> HttpMailRelay {
        HttpMailRelay::new(&MailConfig {
            relay_url: format!("{}/emails", server.uri()),
            api_key: "re_test".to_string(),
            sender: "ia@example.org".to_string(),
            recipient: "prefeitura@example.org".to_string(),
        })
    }

    fn mail(attachments: Vec<Attachment>) -> OutgoingMail {
        OutgoingMail {
            from: "Formulário <ia@example.org>".to_string(),
            to: "prefeitura@example.org".to_string(),
            subject: "[INDICAÇÃO IA] Buraco".to_string(),
            html: "<p>oi</p>".to_string(),
            attachments,
        }
    }

    #[tokio::test]
    async fn posts_message_with_base64_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_json(json!({
                "from": "Formulário <ia@example.org>",
                "to": ["prefeitura@example.org"],
                "subject": "[INDICAÇÃO IA] Buraco",
                "html": "<p>oi</p>",
                "attachments": [{
                    "filename": "problema-urbano-1.jpeg",
                    "content": "aGVsbG8=",
                    "content_type": "image/jpeg"
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let id = relay(&server)
            .send(&mail(vec![Attachment {
                filename: "problema-urbano-1.jpeg".to_string(),
                content_type: "image/jpeg".to_string(),
                content: b"hello".to_vec(),
            }]))
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("msg_1"));
    }

    #[tokio::test]
    async fn rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = relay(&server).send(&mail(Vec::new())).await.unwrap_err();
        assert!(matches!(err, RelayError::Rejected { status: 401, .. }));
    }
}
