//! Request and result types passed between pipeline stages.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::validate::ValidationReport;

/// A validated generation request.
///
/// Construction trims the description and rejects empty input, so holding a
/// `GenerationRequest` means the description is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    description: String,
}

impl GenerationRequest {
    /// Build a request from raw user input.
    pub fn new(description: &str) -> Result<Self, PipelineError> {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        Ok(Self { description: trimmed.to_string() })
    }

    /// The trimmed description.
    #[must_use]
    pub fn description(&self) -> &str {
        debug_assert!(!self.description.is_empty());
        &self.description
    }
}

/// Text produced by one generation call, prompt excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCompletion {
    pub text: String,
}

impl RawCompletion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Successful pipeline output.
///
/// Serializes to the `/api/generate` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Always `true`; failures are reported through [`PipelineError`].
    pub success: bool,
    /// Sanitized HTML document.
    pub code: String,
    /// Report computed on the extracted (pre-sanitization) document.
    pub validation: ValidationReport,
    /// Truncated raw completion.
    pub raw_response: String,
}

impl GenerationOutput {
    /// Format as a summary string.
    pub fn format_summary(&self) -> String {
        let status = if self.validation.valid { "VALID" } else { "INCOMPLETE" };
        let mut summary = format!("[{}] Generated {} lines of HTML\n", status, self.code.lines().count());

        if let Some(length) = self.validation.length {
            summary.push_str(&format!("  Length: {} characters\n", length));
        }
        if let Some(ref missing) = self.validation.missing_tags {
            if !missing.is_empty() {
                summary.push_str(&format!("  Missing tags: {}\n", missing.join(", ")));
            }
        }
        if let Some(ref error) = self.validation.error {
            summary.push_str(&format!("  Error: {}\n", error));
        }

        summary
    }
}

/// First `limit` characters of `text`.
///
/// Counts `char`s, not bytes, so multi-byte text is never split.
#[must_use]
pub fn char_prefix(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_description() {
        let request = GenerationRequest::new("  a red button \n").unwrap();
        assert_eq!(request.description(), "a red button");
    }

    #[test]
    fn test_request_rejects_whitespace() {
        assert_eq!(GenerationRequest::new(""), Err(PipelineError::EmptyInput));
        assert_eq!(GenerationRequest::new(" \t\n "), Err(PipelineError::EmptyInput));
    }

    #[test]
    fn test_char_prefix() {
        assert_eq!(char_prefix("hello", 3), "hel");
        assert_eq!(char_prefix("hello", 10), "hello");
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("", 5), "");
    }

    #[test]
    fn test_format_summary_lists_missing_tags() {
        let output = GenerationOutput {
            success: true,
            code: "<html>\n</html>".to_string(),
            validation: crate::validate::validate("<html>\n</html>"),
            raw_response: String::new(),
        };
        let summary = output.format_summary();
        assert!(summary.starts_with("[INCOMPLETE]"));
        assert!(summary.contains("<head>"));
    }
}
