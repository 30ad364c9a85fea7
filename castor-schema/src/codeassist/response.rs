use crate::gemini::GeminiResponseBody;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Code Assist response envelope: `{"response": GenerateContentResponse, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAssistResponseBody {
    pub response: GeminiResponseBody,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<CodeAssistResponseBody> for GeminiResponseBody {
    fn from(body: CodeAssistResponseBody) -> Self {
        body.response
    }
}
