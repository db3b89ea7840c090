//! # wgen-server
//!
//! HTTP front for the web component generator.
//!
//! ```bash
//! # Serve on :5000 with the 1.3b model
//! cargo run -p wgen-server
//!
//! # Bigger model, front-end from ./static
//! MODEL_SIZE=6.7b cargo run -p wgen-server --features cuda -- --static-dir static
//! ```
//!
//! The model loads on the first generation request, not at startup, and is
//! unloaded on ctrl-c.

pub mod api;
pub mod config;

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wgen_generator::{GenerationOrchestrator, GeneratorConfig};
use wgen_model::{CandleBackend, ModelConfig, ModelHandler};

pub use api::{create_router, AppState, ErrorResponse, GenerateRequest, HealthResponse};
pub use config::ServerConfig;

/// Server startup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides `info`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Model configuration for this server: environment first, then flags.
#[must_use]
pub fn model_config(config: &ServerConfig) -> ModelConfig {
    let mut model_config = ModelConfig::from_env();
    if let Some(ref size) = config.model_size {
        model_config = model_config.with_model_size(size.clone());
    }
    model_config.use_gpu = !config.cpu;
    model_config
}

/// Build the model handler and serve until ctrl-c.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let model_config = model_config(&config);
    let backend = Arc::new(CandleBackend::new(model_config.clone()));
    let handler = Arc::new(ModelHandler::new(backend, &model_config));

    let generator_config = GeneratorConfig {
        max_tokens: config.max_tokens,
        ..Default::default()
    };
    let orchestrator = Arc::new(GenerationOrchestrator::new(Arc::clone(&handler), generator_config));
    let app = create_router(AppState::new(orchestrator), &config);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
    info!(addr = %addr, static_dir = ?config.static_dir, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    handler.unload().await;
    served.map_err(ServerError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
