//! System instruction assembly.
//!
//! The instruction is a persona followed, when retrieval found anything, by
//! the matched reference passages.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::retrieval::Hit;

/// Default persona: a cheerful older sister who knows travel and loyalty
/// points and answers in a friendly tone.
pub const DEFAULT_PERSONA: &str =
    "あなたは旅行とポイントに詳しい明るいお姉さんです。フレンドリーな口調で返答してください。";

/// Default heading placed before the reference passages.
pub const DEFAULT_CONTEXT_HEADER: &str =
    "以下の参考情報が質問に関係する場合は、それを踏まえて回答してください。\n参考情報:";

/// Template for the system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// Persona instruction, always present.
    pub persona: String,
    /// Heading for the reference passages.
    pub context_header: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_owned(),
            context_header: DEFAULT_CONTEXT_HEADER.to_owned(),
        }
    }
}

impl PromptTemplate {
    /// Create a template with a custom persona and the default header.
    #[must_use]
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            ..Self::default()
        }
    }

    /// Sets the context header.
    #[must_use]
    pub fn with_context_header(mut self, header: impl Into<String>) -> Self {
        self.context_header = header.into();
        self
    }

    /// Build the system instruction for a set of hits, best first.
    #[must_use]
    pub fn render(&self, hits: &[Hit]) -> String {
        let persona = self.persona.trim();
        let passages: Vec<&str> = hits
            .iter()
            .map(|h| h.text.trim())
            .filter(|t| !t.is_empty())
            .collect();

        if passages.is_empty() {
            return persona.to_owned();
        }

        let mut out = String::from(persona);
        out.push_str("\n\n");
        out.push_str(self.context_header.trim());
        for passage in passages {
            let _ = write!(out, "\n- {passage}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str, score: f32) -> Hit {
        Hit {
            id: "h".to_owned(),
            text: text.to_owned(),
            score,
        }
    }

    #[test]
    fn no_hits_is_persona_only() {
        let template = PromptTemplate::default();
        assert_eq!(template.render(&[]), DEFAULT_PERSONA);
    }

    #[test]
    fn hits_are_spliced_after_persona() {
        let template = PromptTemplate::new("You are helpful.").with_context_header("Reference:");
        let rendered = template.render(&[
            hit("Miles expire after 36 months.", 0.9),
            hit("Hotel stays earn 10 points per night.", 0.8),
        ]);
        assert_eq!(
            rendered,
            "You are helpful.\n\nReference:\n- Miles expire after 36 months.\n- Hotel stays earn 10 points per night."
        );
    }

    #[test]
    fn blank_hits_ignored() {
        let template = PromptTemplate::new("P");
        assert_eq!(template.render(&[hit("   ", 0.5)]), "P");
    }

    #[test]
    fn deserializes_partial_table() {
        let template: PromptTemplate = serde_json::from_str(r#"{"persona":"Be brief."}"#).unwrap();
        assert_eq!(template.persona, "Be brief.");
        assert_eq!(template.context_header, DEFAULT_CONTEXT_HEADER);
    }
}
