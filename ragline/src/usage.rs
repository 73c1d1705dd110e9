//! Token usage reported by the completion and embedding endpoints.

use serde::{Deserialize, Serialize};

/// Token usage statistics from an LLM operation.
///
/// Accepts OpenAI's `prompt_tokens` / `completion_tokens` field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the input/prompt.
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u32,

    /// Number of tokens in the output/completion.
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u32,

    /// Total tokens used (input + output).
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Create a new usage record.
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sums_total() {
        let usage = Usage::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn accepts_openai_field_names() {
        let usage: Usage = serde_json::from_str(
            r#"{"prompt_tokens": 12, "completion_tokens": 30, "total_tokens": 42}"#,
        )
        .unwrap();
        assert_eq!(usage, Usage::new(12, 30));
    }
}
