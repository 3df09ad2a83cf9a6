//! Civic report API
//!
//! Two stateless handlers for the urban-problem reporting app: one asks a
//! multimodal model to classify a photo and draft a formal complaint, the
//! other mails the finished report to the city office.

pub mod analyzer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod image_data;
pub mod location;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

pub const ANALYZE_PATH: &str = "/api/analyze-problem";
pub const SEND_EMAIL_PATH: &str = "/api/send-email";

/// Create the application router.
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route(
            ANALYZE_PATH,
            post(routes::analyze_problem)
                .options(routes::preflight)
                .fallback(routes::method_not_allowed),
        )
        .route(
            SEND_EMAIL_PATH,
            post(routes::send_email)
                .options(routes::preflight)
                .fallback(routes::method_not_allowed),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
