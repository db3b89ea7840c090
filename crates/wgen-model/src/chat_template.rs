//! DeepSeek-Coder instruct chat format.
//!
//! Single-turn only: a system preamble, the user message under
//! `### Instruction:`, and an open `### Response:` for the model to continue.
//! The BOS token is added by the tokenizer's post-processor, not here.

/// End-of-turn token the instruct models emit when they are done.
pub const END_OF_TURN: &str = "<|EOT|>";

/// Fallback end-of-sequence token.
pub const END_OF_SEQUENCE: &str = "<｜end▁of▁sentence｜>";

const SYSTEM_PREAMBLE: &str = "You are an AI programming assistant, utilizing the DeepSeek Coder model, \
developed by DeepSeek Company, and you only answer questions related to computer science. \
For politically sensitive questions, security and privacy issues, and other non-computer science \
questions, you will refuse to answer\n";

/// Render a single user message with the generation prompt appended.
#[must_use]
pub fn format_instruction(user_message: &str) -> String {
    format!(
        "{system}### Instruction:\n{message}\n### Response:\n",
        system = SYSTEM_PREAMBLE,
        message = user_message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_instruction() {
        let formatted = format_instruction("Build a button");
        assert!(formatted.starts_with("You are an AI programming assistant"));
        assert!(formatted.contains("### Instruction:\nBuild a button\n"));
        assert!(formatted.ends_with("### Response:\n"));
    }

    #[test]
    fn test_message_is_verbatim() {
        let message = "```html\n<p>keep me</p>\n```";
        assert!(format_instruction(message).contains(message));
    }
}
