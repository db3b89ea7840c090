//! Model configuration.

/// Numeric precision the weights are loaded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Half precision, used on CUDA devices.
    F16,
    /// Full precision, used on CPU.
    F32,
}

impl Precision {
    /// Reduced precision on accelerators, full precision otherwise.
    #[must_use]
    pub fn for_device(accelerated: bool) -> Self {
        if accelerated {
            Precision::F16
        } else {
            Precision::F32
        }
    }

    pub fn dtype(&self) -> candle_core::DType {
        match self {
            Precision::F16 => candle_core::DType::F16,
            Precision::F32 => candle_core::DType::F32,
        }
    }
}

/// Model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model variant, e.g. "1.3b" or "6.7b"
    pub model_size: String,
    /// Hub revision to download
    pub revision: String,
    /// Try CUDA device 0 before falling back to CPU
    pub use_gpu: bool,
    /// Concurrent generation calls allowed against the one model instance
    pub max_concurrent_generations: usize,
    /// Sampling seed. `None` draws a fresh seed per call.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_size: "1.3b".to_string(),
            revision: "main".to_string(),
            use_gpu: true,
            max_concurrent_generations: 1,
            seed: None,
        }
    }
}

impl ModelConfig {
    /// Smallest instruct variant.
    pub fn small() -> Self {
        Self::default()
    }

    /// Larger variant for servers with a GPU.
    pub fn large() -> Self {
        Self {
            model_size: "6.7b".to_string(),
            ..Default::default()
        }
    }

    /// Read configuration from the environment.
    ///
    /// `MODEL_SIZE`, `MODEL_REVISION` and `WGEN_SEED` override the defaults.
    /// Read once, when the handler is built.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("MODEL_SIZE") {
            if !size.trim().is_empty() {
                config.model_size = size.trim().to_string();
            }
        }
        if let Ok(revision) = std::env::var("MODEL_REVISION") {
            if !revision.trim().is_empty() {
                config.revision = revision.trim().to_string();
            }
        }
        if let Ok(seed) = std::env::var("WGEN_SEED") {
            match seed.parse() {
                Ok(seed) => config.seed = Some(seed),
                Err(_) => tracing::warn!("ignoring WGEN_SEED={:?}: not a valid u64", seed),
            }
        }

        config
    }

    /// Set the model variant.
    pub fn with_model_size(mut self, size: impl Into<String>) -> Self {
        self.model_size = size.into();
        self
    }

    /// Hugging Face repository for the configured variant.
    #[must_use]
    pub fn model_id(&self) -> String {
        debug_assert!(!self.model_size.is_empty(), "Model size must not be empty");
        format!("deepseek-ai/deepseek-coder-{}-instruct", self.model_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id() {
        assert_eq!(
            ModelConfig::default().model_id(),
            "deepseek-ai/deepseek-coder-1.3b-instruct"
        );
        assert_eq!(
            ModelConfig::large().model_id(),
            "deepseek-ai/deepseek-coder-6.7b-instruct"
        );
    }

    #[test]
    fn test_defaults_serialize_inference() {
        let config = ModelConfig::default();
        assert_eq!(config.max_concurrent_generations, 1);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_precision_for_device() {
        assert_eq!(Precision::for_device(true), Precision::F16);
        assert_eq!(Precision::for_device(false), Precision::F32);
        assert_eq!(Precision::F16.dtype(), candle_core::DType::F16);
    }
}
