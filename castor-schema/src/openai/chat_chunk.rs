//! Chat Completions stream chunks and non-streaming responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `data:` payload of a streaming chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenaiStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenaiChunkChoice>,
    /// Some gateways report failures in-band instead of via the HTTP status.
    #[serde(default)]
    pub error: Option<OpenaiErrorObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenaiChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Option<OpenaiDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenaiDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// DeepSeek / vLLM style reasoning stream.
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// OpenRouter style reasoning stream.
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl OpenaiDelta {
    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning_content
            .as_deref()
            .or(self.reasoning.as_deref())
    }
}

/// Non-streaming chat completion; `choices[].message` mirrors the delta shape.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenaiChatCompletion {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenaiCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenaiCompletionChoice {
    #[serde(default)]
    pub message: Option<OpenaiDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl OpenaiChatCompletion {
    pub fn answer_text(&self) -> Option<&str> {
        self.choices
            .first()?
            .message
            .as_ref()?
            .content
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenaiErrorObject {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Either a numeric status or a string code such as `rate_limit_exceeded`.
    #[serde(default)]
    pub code: Option<Value>,
}

impl OpenaiErrorObject {
    /// HTTP status the error corresponds to, when one can be derived.
    pub fn http_status(&self) -> Option<u16> {
        let from_code = match &self.code {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Some(Value::String(s)) => s.parse::<u16>().ok(),
            _ => None,
        };
        from_code.or_else(|| {
            let kind = self.kind.as_deref().or(match &self.code {
                Some(Value::String(s)) => Some(s.as_str()),
                _ => None,
            })?;
            match kind {
                "rate_limit_exceeded" | "rate_limit_error" | "insufficient_quota" => Some(429),
                "server_error" | "api_error" | "overloaded_error" => Some(500),
                "invalid_request_error" => Some(400),
                "authentication_error" | "invalid_api_key" => Some(401),
                _ => None,
            }
        })
    }

    /// Code string surfaced to callers.
    pub fn code_string(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => self.kind.clone(),
        }
    }
}
