//! Backend abstraction.
//!
//! A [`ModelBackend`] knows how to produce a [`LoadedModel`]; the
//! [`ModelHandler`](crate::ModelHandler) decides when. Both calls are
//! blocking and are run off the async runtime by the handler.

use crate::error::ModelError;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Softmax temperature
    pub temperature: f64,
    /// Nucleus sampling threshold
    pub top_p: f64,
    /// Sample from the distribution instead of taking the argmax
    pub do_sample: bool,
    /// Upper bound on newly generated tokens
    pub max_new_tokens: usize,
    /// RNG seed for this call
    pub seed: u64,
}

impl SamplingParams {
    /// The fixed parameters used for component generation.
    pub fn for_components(max_new_tokens: usize, seed: u64) -> Self {
        debug_assert!(max_new_tokens > 0, "Must allow at least one new token");

        Self {
            temperature: 0.1,
            top_p: 0.9,
            do_sample: true,
            max_new_tokens,
            seed,
        }
    }
}

/// Description of what a backend will load, for logs and health output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    pub model_id: String,
    pub device: String,
    pub precision: String,
}

/// Something that can load a model.
pub trait ModelBackend: Send + Sync + 'static {
    /// Describe the model, device and precision this backend uses.
    fn info(&self) -> BackendInfo;

    /// Acquire tokenizer and weights. Blocking, possibly for minutes.
    fn load(&self) -> Result<Box<dyn LoadedModel>, ModelError>;
}

/// A loaded model ready for inference.
pub trait LoadedModel: Send + Sync {
    /// Run one generation pass and return only the new text.
    ///
    /// The prompt is the bare user message; chat formatting is the model's
    /// concern.
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ModelError>;

    /// Release per-call device memory and caches. Called after every
    /// generation, successful or not. The weights stay loaded.
    fn release_transient(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_sampling_params() {
        let params = SamplingParams::for_components(1024, 7);
        assert!((params.temperature - 0.1).abs() < 1e-9);
        assert!((params.top_p - 0.9).abs() < 1e-9);
        assert!(params.do_sample);
        assert_eq!(params.max_new_tokens, 1024);
        assert_eq!(params.seed, 7);
    }
}
