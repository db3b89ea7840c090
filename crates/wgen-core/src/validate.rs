//! Structural completeness check for extracted HTML.
//!
//! This is a checklist, not a parser: each marker is tested with
//! case-insensitive substring containment. Nesting and balance are not
//! verified.

use serde::{Deserialize, Serialize};

/// Markers every generated document must contain, in report order.
pub const REQUIRED_MARKERS: [&str; 7] = [
    "<!DOCTYPE html>",
    "<html",
    "</html>",
    "<head>",
    "</head>",
    "<body>",
    "</body>",
];

/// Outcome of [`validate`].
///
/// Two shapes exist. For empty input only `valid` and `error` are set. For
/// anything else `missing_tags` and `length` are set and `error` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    fn empty_code() -> Self {
        Self {
            valid: false,
            missing_tags: None,
            length: None,
            error: Some("empty code".to_string()),
        }
    }

    /// Missing markers, empty when the checklist was not run.
    #[must_use]
    pub fn missing(&self) -> &[String] {
        self.missing_tags.as_deref().unwrap_or(&[])
    }
}

/// Check `html` against [`REQUIRED_MARKERS`].
#[must_use]
pub fn validate(html: &str) -> ValidationReport {
    if html.is_empty() {
        return ValidationReport::empty_code();
    }

    let lowered = html.to_lowercase();
    let missing_tags: Vec<String> = REQUIRED_MARKERS
        .iter()
        .filter(|marker| !lowered.contains(&marker.to_lowercase()))
        .map(|marker| marker.to_string())
        .collect();

    let report = ValidationReport {
        valid: missing_tags.is_empty(),
        missing_tags: Some(missing_tags),
        length: Some(html.chars().count()),
        error: None,
    };
    debug_assert!(report.missing().len() <= REQUIRED_MARKERS.len());
    report
}
