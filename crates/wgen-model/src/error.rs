//! Model errors.

use thiserror::Error;

/// Errors from loading or running a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Loading was attempted and did not succeed.
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Model load error: {0}")]
    Load(String),

    #[error("Hub error: {0}")]
    Hub(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fault in this process, such as a panic during inference.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<candle_core::Error> for ModelError {
    fn from(e: candle_core::Error) -> Self {
        ModelError::Inference(e.to_string())
    }
}

impl From<hf_hub::api::sync::ApiError> for ModelError {
    fn from(e: hf_hub::api::sync::ApiError) -> Self {
        ModelError::Hub(e.to_string())
    }
}

impl From<tokenizers::Error> for ModelError {
    fn from(e: tokenizers::Error) -> Self {
        ModelError::Tokenizer(e.to_string())
    }
}

impl From<ModelError> for wgen_core::PipelineError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Unavailable(msg) => wgen_core::PipelineError::ModelUnavailable(msg),
            ModelError::Load(msg) | ModelError::Hub(msg) => {
                wgen_core::PipelineError::ModelUnavailable(msg)
            }
            ModelError::Tokenizer(msg) | ModelError::Inference(msg) => {
                wgen_core::PipelineError::GenerationFailed(msg)
            }
            ModelError::Io(e) => wgen_core::PipelineError::GenerationFailed(e.to_string()),
            ModelError::Internal(msg) => wgen_core::PipelineError::InternalFault(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgen_core::PipelineError;

    #[test]
    fn test_pipeline_mapping() {
        let err: PipelineError = ModelError::Unavailable("no weights".into()).into();
        assert_eq!(err, PipelineError::ModelUnavailable("no weights".into()));

        let err: PipelineError = ModelError::Inference("oom".into()).into();
        assert_eq!(err, PipelineError::GenerationFailed("oom".into()));

        let err: PipelineError = ModelError::Tokenizer("bad utf8".into()).into();
        assert_eq!(err.category(), "generation_failed");

        let err: PipelineError = ModelError::Internal("generation task panicked".into()).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), "internal server error");
    }
}
