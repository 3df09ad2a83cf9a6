//! Problem analyzer: photo in, civic-issue classification out.

pub mod client;
pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::image_data::{self, EmbeddedImage, ImageKind};
use crate::location::{GeoPoint, RawCoordinate};

use client::{InferenceClient, InferenceError, InferenceRequest};
use prompt::PromptOptions;

pub const MISSING_IMAGE_MESSAGE: &str = "A imagem é obrigatória para análise.";
pub const INVALID_IMAGE_MESSAGE: &str = "A imagem enviada não é válida.";
pub const SERVICE_FAILURE_MESSAGE: &str =
    "Falha interna ao analisar a imagem. Tente novamente mais tarde.";
pub const ADDRESS_PLACEHOLDER: &str = "Endereço não disponível.";
pub const POSITION_PLACEHOLDER: &str = "Posição não disponível.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub latitude: Option<RawCoordinate>,
    #[serde(default)]
    pub longitude: Option<RawCoordinate>,
}

/// The model's answer. Fields beyond the known ones are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub is_inappropriate: bool,
    pub problem_type: String,
    pub formal_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_position: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body sent with 4xx/5xx so the app can render every field regardless.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFailure {
    pub error: String,
    pub is_inappropriate: bool,
    pub problem_type: String,
    pub formal_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_position: Option<String>,
}

impl AnalysisFailure {
    pub fn for_error(err: &ApiError, options: &PromptOptions) -> Self {
        let (error, problem_type, formal_description) = match err {
            ApiError::Validation(msg) => (
                msg.clone(),
                "Solicitação inválida",
                "Não foi possível analisar a imagem enviada.",
            ),
            _ => (
                SERVICE_FAILURE_MESSAGE.to_string(),
                "Erro interno",
                "Não foi possível gerar a descrição devido a uma falha no servidor.",
            ),
        };

        Self {
            error,
            is_inappropriate: false,
            problem_type: problem_type.to_string(),
            formal_description: formal_description.to_string(),
            street_address: options
                .wants_address()
                .then(|| ADDRESS_PLACEHOLDER.to_string()),
            street_position: options
                .wants_position()
                .then(|| POSITION_PLACEHOLDER.to_string()),
        }
    }
}

impl AnalysisResult {
    /// Answer for an image the inference service refused to look at.
    pub fn refused(options: &PromptOptions) -> Self {
        let mut result = Self {
            is_inappropriate: true,
            problem_type: "Conteúdo impróprio".to_string(),
            formal_description: "A imagem enviada foi recusada por conter conteúdo impróprio \
                                 e não pode ser usada em uma indicação."
                .to_string(),
            street_address: None,
            street_position: None,
            extra: Map::new(),
        };
        result.fill_requested_fields(options);
        result
    }

    /// Requested location fields the model left empty or `null` get placeholders.
    fn fill_requested_fields(&mut self, options: &PromptOptions) {
        if options.wants_address() && self.street_address.is_none() {
            self.street_address = Some(ADDRESS_PLACEHOLDER.to_string());
        }
        if options.wants_position() && self.street_position.is_none() {
            self.street_position = Some(POSITION_PLACEHOLDER.to_string());
        }
    }
}

pub struct Analyzer {
    client: Arc<dyn InferenceClient>,
    options: PromptOptions,
}

impl Analyzer {
    pub fn new(client: Arc<dyn InferenceClient>, options: PromptOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &PromptOptions {
        &self.options
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> ApiResult<AnalysisResult> {
        let image = request
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::validation(MISSING_IMAGE_MESSAGE))?;

        let embedded = EmbeddedImage::parse(image);
        let bytes = embedded.decode().map_err(|e| {
            warn!(error = %e, "rejecting undecodable image");
            ApiError::validation(INVALID_IMAGE_MESSAGE)
        })?;
        let mime_type = embedded
            .declared_mime_type()
            .map(str::to_string)
            .unwrap_or_else(|| ImageKind::sniff(&bytes).mime_type.to_string());

        let location = GeoPoint::from_parts(request.latitude.as_ref(), request.longitude.as_ref());

        let inference = InferenceRequest {
            instruction: prompt::build_instruction(&self.options, location.as_ref()),
            image_mime_type: mime_type,
            image_base64: image_data::encode(&bytes),
            response_schema: Some(prompt::response_schema(&self.options)),
        };

        let reply = match self.client.generate(&inference).await {
            Ok(reply) => reply,
            Err(InferenceError::Blocked { reason }) => {
                warn!(%reason, "image refused by inference safety filter");
                return Ok(AnalysisResult::refused(&self.options));
            }
            Err(e) => {
                error!(error = %e, "inference call failed");
                return Err(ApiError::from(e));
            }
        };

        let mut result = parse_reply(&reply).map_err(|e| {
            error!(error = %e, "inference reply is not a valid analysis");
            e
        })?;
        result.fill_requested_fields(&self.options);

        info!(
            inappropriate = result.is_inappropriate,
            problem_type = %result.problem_type,
            "image analyzed"
        );
        Ok(result)
    }
}

/// Accepts the bare JSON object, or one wrapped in a markdown code fence.
pub fn parse_reply(reply: &str) -> ApiResult<AnalysisResult> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(body.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_replies() {
        let plain = r#"{"is_inappropriate":false,"problem_type":"Buraco","formal_description":"Texto"}"#;
        let result = parse_reply(plain).unwrap();
        assert_eq!(result.problem_type, "Buraco");
        assert!(result.street_address.is_none());

        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(parse_reply(&fenced).unwrap(), result);
    }

    #[test]
    fn extra_fields_survive() {
        let reply = r#"{"is_inappropriate":false,"problem_type":"P","formal_description":"D","confidence":0.9}"#;
        let result = parse_reply(reply).unwrap();
        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back, serde_json::from_str::<Value>(reply).unwrap());
    }

    #[test]
    fn missing_required_fields_fail() {
        assert!(parse_reply(r#"{"problem_type":"P"}"#).is_err());
        assert!(parse_reply("Desculpe, não consigo ajudar.").is_err());
    }

    #[test]
    fn failure_shape_tracks_toggles() {
        let options = PromptOptions {
            include_location: true,
            estimate_address: true,
            estimate_position: false,
        };
        let failure = AnalysisFailure::for_error(&ApiError::validation(MISSING_IMAGE_MESSAGE), &options);
        assert_eq!(failure.error, MISSING_IMAGE_MESSAGE);
        assert!(!failure.is_inappropriate);
        assert_eq!(failure.street_address.as_deref(), Some(ADDRESS_PLACEHOLDER));
        assert!(failure.street_position.is_none());
    }

    #[test]
    fn null_address_gets_placeholder_when_requested() {
        let options = PromptOptions {
            include_location: true,
            estimate_address: true,
            estimate_position: true,
        };
        let mut result = parse_reply(
            r#"{"is_inappropriate":false,"problem_type":"P","formal_description":"D","street_address":null}"#,
        )
        .unwrap();
        result.fill_requested_fields(&options);

        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body["street_address"], ADDRESS_PLACEHOLDER);
        assert_eq!(body["street_position"], POSITION_PLACEHOLDER);

        let mut plain = parse_reply(r#"{"is_inappropriate":false,"problem_type":"P","formal_description":"D"}"#).unwrap();
        plain.fill_requested_fields(&PromptOptions::default());
        assert!(serde_json::to_value(&plain).unwrap().get("street_address").is_none());
    }

    #[test]
    fn refused_image_is_flagged_inappropriate() {
        let options = PromptOptions {
            include_location: true,
            estimate_address: true,
            estimate_position: false,
        };
        let result = AnalysisResult::refused(&options);
        assert!(result.is_inappropriate);
        assert_eq!(result.street_address.as_deref(), Some(ADDRESS_PLACEHOLDER));
        assert!(result.street_position.is_none());
    }
}
