//! # wgen-core
//!
//! The deterministic half of the web component generator.
//!
//! Everything in this crate is pure: no model, no I/O. Given a description it
//! renders the prompt, and given whatever text the model produced it finds,
//! checks and cleans the HTML document inside it.
//!
//! ## Pipeline
//!
//! ```text
//! description ──> PromptBuilder ──> (model) ──> extract_html ──> validate ──> sanitize
//! ```
//!
//! | Stage | Item | Failure |
//! |-------|------|---------|
//! | Prompt | [`PromptBuilder`] | never |
//! | Extraction | [`extract_html`] | `None` (model ignored the format) |
//! | Validation | [`validate`] | never, reports missing markers |
//! | Sanitization | [`Sanitizer`] | never |
//!
//! Errors surfaced to callers use the [`PipelineError`] taxonomy.

pub mod error;
pub mod extract;
pub mod prompt;
pub mod sanitize;
pub mod types;
pub mod validate;

pub use error::PipelineError;
pub use extract::{extract_html, extract_with_pattern, ExtractionPattern};
pub use prompt::PromptBuilder;
pub use sanitize::{Sanitizer, TrimSanitizer};
pub use types::{char_prefix, GenerationOutput, GenerationRequest, RawCompletion};
pub use validate::{validate, ValidationReport, REQUIRED_MARKERS};
