//! Generation orchestrator.
//!
//! Runs one request through prompt → model → extract → validate → sanitize
//! and maps every failure to a [`PipelineError`]. No stage is retried; the
//! caller may resubmit.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use wgen_core::{
    char_prefix, extract_with_pattern, validate, GenerationOutput, GenerationRequest,
    PipelineError, PromptBuilder, Sanitizer, TrimSanitizer,
};
use wgen_model::ModelHandler;

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum new tokens per generation
    pub max_tokens: usize,
    /// Characters of raw output attached to an extraction failure
    pub failure_preview_chars: usize,
    /// Characters of raw output kept in a successful response
    pub response_preview_chars: usize,
    /// Raw output longer than this (in characters) gets truncated and marked
    pub response_truncate_threshold: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            failure_preview_chars: 500,
            response_preview_chars: 2000,
            response_truncate_threshold: 200,
        }
    }
}

impl GeneratorConfig {
    /// Short completions for fast iteration.
    pub fn quick() -> Self {
        Self {
            max_tokens: 512,
            ..Default::default()
        }
    }

    /// Room for larger components.
    pub fn thorough() -> Self {
        Self {
            max_tokens: 2048,
            ..Default::default()
        }
    }

    /// Preview of a successful completion.
    ///
    /// The threshold that decides whether to truncate (200) differs from the
    /// truncation length (2000). A completion of 201 to 2000 characters is
    /// therefore returned whole with `...` appended.
    #[must_use]
    pub fn response_preview(&self, raw: &str) -> String {
        if raw.chars().count() > self.response_truncate_threshold {
            format!("{}...", char_prefix(raw, self.response_preview_chars))
        } else {
            raw.to_string()
        }
    }

    /// Preview attached to an extraction failure.
    #[must_use]
    pub fn failure_preview(&self, raw: &str) -> String {
        char_prefix(raw, self.failure_preview_chars).to_string()
    }
}

/// Parse a max-new-tokens value from a flag or environment variable.
///
/// Zero is rejected: the model would produce nothing and every request would
/// fail extraction.
pub fn parse_max_tokens(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("max tokens must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid max tokens '{}': {}", value, e)),
    }
}

/// Sequences the pipeline stages for one request.
pub struct GenerationOrchestrator {
    model: Arc<ModelHandler>,
    sanitizer: Box<dyn Sanitizer>,
    config: GeneratorConfig,
}

impl GenerationOrchestrator {
    /// Create an orchestrator using the trimming sanitizer.
    pub fn new(model: Arc<ModelHandler>, config: GeneratorConfig) -> Self {
        Self {
            model,
            sanitizer: Box::new(TrimSanitizer),
            config,
        }
    }

    /// Replace the sanitization policy.
    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    /// The model handle this orchestrator drives.
    pub fn model(&self) -> &Arc<ModelHandler> {
        &self.model
    }

    /// Get the current config.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a component for `description`.
    pub async fn run(&self, description: &str) -> Result<GenerationOutput, PipelineError> {
        let request = GenerationRequest::new(description)?;
        let start = Instant::now();
        info!(description = %char_prefix(request.description(), 100), "generating component");

        let prompt = PromptBuilder::build_generation_prompt(request.description());
        let completion = self
            .model
            .generate(&prompt, self.config.max_tokens)
            .await
            .map_err(PipelineError::from)?;
        let raw = completion.text;

        let (pattern, html) = match extract_with_pattern(&raw) {
            Some(found) => found,
            None => {
                warn!(raw_chars = raw.chars().count(), "no HTML document in model output");
                return Err(PipelineError::ExtractionFailed {
                    raw_preview: self.config.failure_preview(&raw),
                });
            }
        };

        // The report describes what the model produced, before cleanup.
        let validation = validate(&html);
        let code = self.sanitizer.sanitize(&html);

        info!(
            pattern = pattern.name(),
            sanitizer = self.sanitizer.name(),
            valid = validation.valid,
            missing = validation.missing().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "component generated"
        );

        Ok(GenerationOutput {
            success: true,
            code,
            validation,
            raw_response: self.config.response_preview(&raw),
        })
    }
}
