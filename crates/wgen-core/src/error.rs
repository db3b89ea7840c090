//! User-facing error taxonomy.
//!
//! Every failure of the generation pipeline ends up as one of these variants
//! before it reaches a caller. Internal detail stays in logs; the client sees
//! [`PipelineError::client_message`].

use thiserror::Error;

/// Pipeline failure, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Description was missing, empty, or whitespace only.
    #[error("Empty input: description is required")]
    EmptyInput,

    /// The model could not be loaded.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Inference failed after the model was loaded.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The completion did not contain a recognizable HTML document.
    #[error("Extraction failed: HTML code not found in response")]
    ExtractionFailed {
        /// First characters of the raw completion, for diagnostics.
        raw_preview: String,
    },

    /// Request body exceeded the configured limit.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Anything unexpected. The detail is for logs only.
    #[error("Internal fault: {0}")]
    InternalFault(String),
}

impl PipelineError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::EmptyInput => 400,
            PipelineError::PayloadTooLarge => 413,
            PipelineError::ModelUnavailable(_)
            | PipelineError::GenerationFailed(_)
            | PipelineError::ExtractionFailed { .. }
            | PipelineError::InternalFault(_) => 500,
        }
    }

    /// Stable category name, used in logs and summaries.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::EmptyInput => "empty_input",
            PipelineError::ModelUnavailable(_) => "model_unavailable",
            PipelineError::GenerationFailed(_) => "generation_failed",
            PipelineError::ExtractionFailed { .. } => "extraction_failed",
            PipelineError::PayloadTooLarge => "payload_too_large",
            PipelineError::InternalFault(_) => "internal_fault",
        }
    }

    /// Message safe to show to a client.
    ///
    /// `InternalFault` detail is never exposed.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            PipelineError::EmptyInput => "description is empty".to_string(),
            PipelineError::ModelUnavailable(_) => "unable to load model".to_string(),
            PipelineError::GenerationFailed(msg) => msg.clone(),
            PipelineError::ExtractionFailed { .. } => "HTML code not found in response".to_string(),
            PipelineError::PayloadTooLarge => "payload too large".to_string(),
            PipelineError::InternalFault(_) => "internal server error".to_string(),
        }
    }

    /// Raw completion preview attached to the error, if any.
    #[must_use]
    pub fn raw_preview(&self) -> Option<&str> {
        match self {
            PipelineError::ExtractionFailed { raw_preview } => Some(raw_preview),
            _ => None,
        }
    }
}
