use super::Content;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Gemini `GenerateContentResponse`, one per SSE `data:` line when streaming.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[allow(non_snake_case)]
pub struct GeminiResponseBody {
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub promptFeedback: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usageMetadata: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modelVersion: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responseId: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    #[serde(rename = "finishReason", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GeminiResponseBody {
    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Concatenated non-thought text of the first candidate.
    pub fn answer_text(&self) -> Option<String> {
        let parts = &self.first_candidate()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_chunk_with_finish_reason_parses() {
        let body: GeminiResponseBody = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi"}]},
                "finishReason": "STOP",
                "index": 0
            }],
            "modelVersion": "gemini-2.5-pro"
        }))
        .unwrap();

        let candidate = body.first_candidate().unwrap();
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(body.modelVersion.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn answer_text_skips_thought_parts() {
        let body: GeminiResponseBody = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"thought": true, "text": "thinking"},
                    {"text": "Hello, "},
                    {"text": "world"}
                ]}
            }]
        }))
        .unwrap();

        assert_eq!(body.answer_text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn usage_only_chunk_has_no_answer() {
        let body: GeminiResponseBody =
            serde_json::from_value(json!({"usageMetadata": {"totalTokenCount": 3}})).unwrap();
        assert!(body.candidates.is_empty());
        assert!(body.answer_text().is_none());
    }
}
