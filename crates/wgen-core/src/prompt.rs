//! Prompt rendering for web component generation.
//!
//! The template is static. The description is embedded verbatim in the task
//! line and again after the format example.

/// Prompt builder for component descriptions.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the generation prompt for a description.
    ///
    /// The description is expected to be trimmed and non-empty; the
    /// orchestrator rejects empty input before calling this.
    pub fn build_generation_prompt(description: &str) -> String {
        debug_assert!(!description.trim().is_empty(), "Description must not be empty");

        format!(
            r#"You are an expert web developer. Create a complete, working HTML/CSS/JS component for: {description}

Requirements:
- Self-contained, valid HTML5
- Modern CSS embedded in the page (Flexbox/Grid)
- Vanilla JavaScript only if needed
- Responsive, polished design
- No external dependencies

Respond ONLY with the complete HTML code in this format:
```html
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Component</title>
    <style>
        /* Modern CSS here */
    </style>
</head>
<body>
    <!-- Component HTML here -->
    <script>
        // JavaScript if needed
    </script>
</body>
</html>
```

Description: {description}"#,
            description = description,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_description() {
        let prompt = PromptBuilder::build_generation_prompt("a red button");
        assert!(prompt.contains("a red button"));
        assert!(prompt.ends_with("Description: a red button"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = PromptBuilder::build_generation_prompt("a pricing table");
        let b = PromptBuilder::build_generation_prompt("a pricing table");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_requests_single_html_block() {
        let prompt = PromptBuilder::build_generation_prompt("a navbar");
        assert_eq!(prompt.matches("```html").count(), 1);
        for section in ["<!DOCTYPE html>", "<head>", "<style>", "<body>", "<script>"] {
            assert!(prompt.contains(section), "prompt is missing {}", section);
        }
        assert!(prompt.contains("ONLY"));
    }

    #[test]
    fn test_template_is_itself_a_valid_document() {
        let prompt = PromptBuilder::build_generation_prompt("a card");
        let html = crate::extract::extract_html(&prompt).unwrap();
        assert!(crate::validate::validate(&html).valid);
    }
}
