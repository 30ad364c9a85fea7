//! Ollama `/api/chat` request and NDJSON response lines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,

    /// Enables the `message.thinking` channel on reasoning models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OllamaMessage {
    /// Absent on some streamed response lines.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,

    /// Base64 image payloads without a data-URL prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OllamaOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One NDJSON line of a chat response (also the whole non-streaming body).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OllamaStreamChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
