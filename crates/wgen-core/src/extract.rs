//! HTML extraction from model output.
//!
//! Models rarely answer with the bare document. The extractor tries a fixed,
//! ordered list of patterns and returns the first capture, trimmed:
//!
//! 1. [`ExtractionPattern::TaggedFence`]: a fence tagged `html`
//! 2. [`ExtractionPattern::DoctypeFence`]: an untagged fence starting with a DOCTYPE
//! 3. [`ExtractionPattern::BareDoctype`]: a DOCTYPE-to-`</html>` span with no fence
//!
//! All patterns are case-insensitive and let `.` cross line boundaries.
//! Finding nothing is a normal outcome, not an error.

use std::sync::OnceLock;

use regex::Regex;

/// One extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPattern {
    /// A fence tagged `html`.
    TaggedFence,
    /// An untagged fence whose content starts with `<!DOCTYPE html`.
    DoctypeFence,
    /// A `<!DOCTYPE html` ... `</html>` span anywhere in the text.
    BareDoctype,
}

impl ExtractionPattern {
    /// All patterns, in the order they are tried.
    pub const ORDERED: [ExtractionPattern; 3] = [
        ExtractionPattern::TaggedFence,
        ExtractionPattern::DoctypeFence,
        ExtractionPattern::BareDoctype,
    ];

    /// Get the name of this pattern.
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionPattern::TaggedFence => "tagged-fence",
            ExtractionPattern::DoctypeFence => "doctype-fence",
            ExtractionPattern::BareDoctype => "bare-doctype",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            ExtractionPattern::TaggedFence => r"(?is)```html\r?\n(.*?)\r?\n```",
            ExtractionPattern::DoctypeFence => r"(?is)```\r?\n(<!DOCTYPE html.*?)\r?\n```",
            ExtractionPattern::BareDoctype => r"(?is)(<!DOCTYPE html.*?</html>)",
        }
    }

    fn regex(&self) -> &'static Regex {
        static COMPILED: OnceLock<[Regex; 3]> = OnceLock::new();
        let compiled = COMPILED.get_or_init(|| {
            ExtractionPattern::ORDERED
                .map(|p| Regex::new(p.source()).expect("extraction pattern is a valid regex"))
        });
        match self {
            ExtractionPattern::TaggedFence => &compiled[0],
            ExtractionPattern::DoctypeFence => &compiled[1],
            ExtractionPattern::BareDoctype => &compiled[2],
        }
    }

    /// Apply this pattern alone.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex()
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// Extract the first HTML document, reporting which pattern matched.
pub fn extract_with_pattern(text: &str) -> Option<(ExtractionPattern, String)> {
    ExtractionPattern::ORDERED
        .iter()
        .find_map(|pattern| pattern.capture(text).map(|html| (*pattern, html.to_string())))
}

/// Extract the first HTML document from raw model output.
pub fn extract_html(text: &str) -> Option<String> {
    extract_with_pattern(text).map(|(_, html)| html)
}
