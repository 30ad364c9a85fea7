//! Typed Gemini request schema for generate-content endpoints.
//!
//! The same body is sent to the public `v1beta` API and, wrapped in the Code Assist
//! envelope, to `v1internal` endpoints. Unknown fields survive in `extra` maps so
//! responses and requests captured from the wire can be replayed unchanged.

mod content;
mod generation;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use content::{Content, Part};
pub use generation::{GenerationConfig, ThinkingConfig};

/// Gemini `generateContent` / `streamGenerateContent` request body.
///
/// Reference: <https://ai.google.dev/gemini-api/docs/text-generation>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateContentRequest {
    /// Required conversation turns.
    pub contents: Vec<Content>,

    /// System-level instruction, a role-less `Content` with a single text part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Generation parameters (temperature, thinking, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,

    /// Catch-all for optional fields such as `safetySettings` or `sessionId`.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GeminiGenerateContentRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: None,
            generation_config: None,
            extra: BTreeMap::new(),
        }
    }

    /// Replace `systemInstruction` with a single text part.
    ///
    /// Blank text clears the instruction.
    pub fn set_system_text(&mut self, text: &str) {
        self.system_instruction = (!text.trim().is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::text(text)],
            extra: BTreeMap::new(),
        });
    }

    /// Text of the first `systemInstruction` part, if any.
    pub fn system_text(&self) -> Option<&str> {
        self.system_instruction
            .as_ref()
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.as_deref())
    }

    pub fn generation_config_mut(&mut self) -> &mut GenerationConfig {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_request_serializes_without_optional_fields() {
        let req = GeminiGenerateContentRequest::new(vec![Content::user(vec![Part::text("hi")])]);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn missing_contents_rejected() {
        let err = serde_json::from_value::<GeminiGenerateContentRequest>(json!({})).unwrap_err();
        assert!(err.to_string().contains("contents"));
    }

    #[test]
    fn system_text_is_set_and_cleared() {
        let mut req = GeminiGenerateContentRequest::new(Vec::new());
        req.set_system_text("be brief");
        assert_eq!(req.system_text(), Some("be brief"));
        assert!(req.system_instruction.as_ref().unwrap().role.is_none());

        req.set_system_text("   ");
        assert!(req.system_instruction.is_none());
    }

    #[test]
    fn full_request_roundtrips() {
        let input = json!({
            "contents": [
                {"role": "user", "parts": [{"text": "What is Rust?"}]},
                {"role": "model", "parts": [{"text": "A systems language."}]},
                {"role": "user", "parts": [
                    {"text": "describe this"},
                    {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
                ]}
            ],
            "systemInstruction": {"parts": [{"text": "be helpful"}]},
            "generationConfig": {
                "temperature": 0.7,
                "thinkingConfig": {"includeThoughts": true, "thinkingBudget": 1024}
            },
            "sessionId": "-42"
        });

        let req: GeminiGenerateContentRequest = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.system_text(), Some("be helpful"));
        assert_eq!(req.extra.get("sessionId"), Some(&json!("-42")));
        assert_eq!(serde_json::to_value(&req).unwrap(), input);
    }
}
