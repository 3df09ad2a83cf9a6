//! Error taxonomy shared by both handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analyzer::client::InferenceError;
use crate::dispatcher::relay::RelayError;
use crate::image_data::ImageDataError;

/// Message returned for any verb other than POST (and OPTIONS).
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method Not Allowed. Use POST.";

/// Generic caller-visible text for service failures.
pub const SERVICE_FAILURE_MESSAGE: &str = "Erro interno ao processar a solicitação.";

/// Errors a handler can end a request with.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("inference service failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("inference reply is not the expected JSON object: {0}")]
    MalformedReply(#[from] serde_json::Error),

    #[error("mail relay failed: {0}")]
    Relay(#[from] RelayError),

    #[error("report rendering failed: {0}")]
    Template(#[from] tera::Error),

    #[error("attachment could not be prepared: {0}")]
    Attachment(#[from] ImageDataError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the caller. Service failures never leak upstream detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::MethodNotAllowed => METHOD_NOT_ALLOWED_MESSAGE.to_string(),
            _ => SERVICE_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.public_message() }))).into_response()
    }
}
