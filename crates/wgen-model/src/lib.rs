//! # wgen-model
//!
//! Owns the language model used to generate components.
//!
//! [`ModelHandler`] is the single owner of the loaded model. It loads lazily on
//! the first generation call, serializes inference, and can unload on demand.
//! What "a model" is comes from a [`ModelBackend`]:
//!
//! - [`CandleBackend`]: DeepSeek-Coder instruct weights from the Hugging Face
//!   hub, run locally with Candle (CUDA when available, CPU otherwise)
//! - `FakeBackend` (feature `fake`): canned completions for tests
//!
//! ## Lifecycle
//!
//! ```text
//! UNLOADED ──ensure_loaded──> LOADING ──ok──> LOADED
//!    ^                           │              │
//!    └───────────err─────────────┘              │
//!    └────────────────unload────────────────────┘
//! ```
//!
//! A failed load is not sticky; the next call tries again.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wgen_model::{CandleBackend, ModelConfig, ModelHandler};
//!
//! let config = ModelConfig::from_env();
//! let handler = ModelHandler::new(Arc::new(CandleBackend::new(config.clone())), &config);
//! let completion = handler.generate(&prompt, 1024).await?;
//! ```

pub mod backend;
pub mod candle;
pub mod chat_template;
pub mod config;
pub mod error;
pub mod handler;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use backend::{BackendInfo, LoadedModel, ModelBackend, SamplingParams};
pub use candle::CandleBackend;
pub use config::{ModelConfig, Precision};
pub use error::ModelError;
pub use handler::{ModelHandler, ModelState};

#[cfg(any(test, feature = "fake"))]
pub use fake::FakeBackend;
