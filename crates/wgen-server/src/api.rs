//! HTTP API.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Liveness and whether the model is loaded
//! - `POST /api/generate` - Generate a component from `{"description": ...}`
//! - `POST /api/chat` - Same pipeline, reading `{"message": ...}`
//! - `GET /` - Front-end, when a static directory is configured
//!
//! Errors are JSON `{"error": ...}` bodies. Extraction failures also carry a
//! `raw_response` preview.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, warn};
use wgen_core::{GenerationOutput, PipelineError};
use wgen_generator::GenerationOrchestrator;
use wgen_model::ModelHandler;

use crate::config::ServerConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<GenerationOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<GenerationOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn model(&self) -> &Arc<ModelHandler> {
        self.orchestrator.model()
    }
}

/// Body of `/api/generate` and `/api/chat`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `/api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Errors returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Body had no usable description field.
    MissingDescription,
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::Pipeline(PipelineError::PayloadTooLarge)
        } else {
            warn!(reason = %rejection.body_text(), "rejected request body");
            ApiError::MissingDescription
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingDescription => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "description is required".to_string(),
                    raw_response: None,
                }),
            )
                .into_response(),
            ApiError::Pipeline(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    error!(category = err.category(), detail = %err, "request failed");
                }
                let body = ErrorResponse {
                    error: err.client_message(),
                    raw_response: err.raw_preview().map(str::to_string),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Build the router.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    let router = match config.static_dir {
        Some(ref dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Pipeline(PipelineError::InternalFault(detail.to_string())).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.model().is_loaded(),
    })
}

async fn generate_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationOutput>, ApiError> {
    let Json(request) = body?;
    let description = request.description.ok_or(ApiError::MissingDescription)?;
    run_pipeline(&state, &description).await
}

/// `/api/chat`: `message` takes the place of `description`.
async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationOutput>, ApiError> {
    let Json(request) = body?;
    let description = request
        .message
        .or(request.description)
        .ok_or(ApiError::MissingDescription)?;
    run_pipeline(&state, &description).await
}

async fn run_pipeline(state: &AppState, description: &str) -> Result<Json<GenerationOutput>, ApiError> {
    let output = state.orchestrator.run(description).await?;
    Ok(Json(output))
}
