//! HTTP handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::analyzer::{AnalysisFailure, AnalysisRequest};
use crate::dispatcher::{ReportRequest, FAILED_MESSAGE, SENT_MESSAGE};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn analyze_problem(
    State(state): State<AppState>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Response {
    let options = *state.analyzer.options();

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable analysis request");
            let err = ApiError::validation(rejection.body_text());
            return (err.status(), Json(AnalysisFailure::for_error(&err, &options))).into_response();
        }
    };

    match state.analyzer.analyze(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => (err.status(), Json(AnalysisFailure::for_error(&err, &options))).into_response(),
    }
}

pub async fn send_email(
    State(state): State<AppState>,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable report request");
            return ApiError::validation(rejection.body_text()).into_response();
        }
    };

    match state.dispatcher.dispatch(request).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": SENT_MESSAGE }))).into_response(),
        Err(err) => (err.status(), Json(json!({ "message": FAILED_MESSAGE }))).into_response(),
    }
}

/// Bare OPTIONS requests (no CORS preflight headers) still get a 200.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
