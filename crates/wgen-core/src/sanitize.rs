//! Sanitization policy for extracted HTML.
//!
//! Today the only policy trims surrounding whitespace. Content stripping
//! (inline event handlers, external script sources) plugs in as another
//! [`Sanitizer`] without touching the pipeline.

/// A sanitization policy.
pub trait Sanitizer: Send + Sync {
    /// Return the cleaned document.
    fn sanitize(&self, html: &str) -> String;

    /// Policy name, for logs.
    fn name(&self) -> &'static str;
}

/// Trims leading and trailing whitespace, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimSanitizer;

impl Sanitizer for TrimSanitizer {
    fn sanitize(&self, html: &str) -> String {
        html.trim().to_string()
    }

    fn name(&self) -> &'static str {
        "trim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim() {
        assert_eq!(TrimSanitizer.sanitize("\n  <html></html>\t\n"), "<html></html>");
    }

    #[test]
    fn test_idempotent() {
        let once = TrimSanitizer.sanitize("  <p>x</p>  ");
        let twice = TrimSanitizer.sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_keeps_scripts() {
        let html = "<script>alert(1)</script>";
        assert_eq!(TrimSanitizer.sanitize(html), html);
    }
}
