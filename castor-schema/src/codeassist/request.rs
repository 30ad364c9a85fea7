//! Typed request schema for the Code Assist upstream envelope.

use crate::gemini::GeminiGenerateContentRequest;
use serde::{Deserialize, Serialize};

/// Runtime metadata needed to wrap a Gemini request into the Code Assist envelope.
#[derive(Debug, Clone)]
pub struct CodeAssistRequestMeta {
    pub project: String,
    pub request_id: String,
    pub model: String,
    pub session_id: Option<String>,
}

impl CodeAssistRequestMeta {
    /// Build the upstream envelope; a session id, when present, is written into
    /// the embedded request as `sessionId`.
    pub fn into_request(self, mut request: GeminiGenerateContentRequest) -> CodeAssistRequestBody {
        if let Some(session_id) = self.session_id {
            request
                .extra
                .insert("sessionId".to_string(), session_id.into());
        }
        CodeAssistRequestBody {
            project: self.project,
            request_id: self.request_id,
            request,
            model: self.model,
            user_agent: CodeAssistRequestBody::USER_AGENT.to_string(),
            request_type: CodeAssistRequestBody::REQUEST_TYPE.to_string(),
        }
    }
}

/// Code Assist upstream request envelope.
///
/// All fields are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAssistRequestBody {
    pub project: String,
    pub request_id: String,
    pub request: GeminiGenerateContentRequest,
    pub model: String,
    pub user_agent: String,
    pub request_type: String,
}

impl CodeAssistRequestBody {
    pub const USER_AGENT: &str = "antigravity";
    pub const REQUEST_TYPE: &str = "agent";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_request() -> GeminiGenerateContentRequest {
        serde_json::from_value(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
        }))
        .unwrap()
    }

    #[test]
    fn full_envelope_roundtrips() {
        let input = json!({
            "project": "test-project",
            "requestId": "agent/1770489747018/b9acb5be-0d95-407e-a9cf-94315ff8a43e",
            "request": {"contents": [{"role": "user", "parts": [{"text": "hello"}]}]},
            "model": "gemini-3-pro-high",
            "userAgent": "antigravity",
            "requestType": "agent"
        });

        let body: CodeAssistRequestBody = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&body).unwrap(), input);
    }

    #[test]
    fn all_fields_are_required() {
        let err = serde_json::from_value::<CodeAssistRequestBody>(json!({
            "project": "test-project",
            "request": {"contents": []},
            "model": "gemini-3-pro-high",
            "userAgent": "antigravity",
            "requestType": "agent"
        }))
        .unwrap_err();

        assert!(err.to_string().contains("requestId"));
    }

    #[test]
    fn into_request_applies_fixed_fields_and_session() {
        let body = CodeAssistRequestMeta {
            project: "project-1".to_string(),
            request_id: "agent/1/00000000-0000-4000-8000-000000000000".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            session_id: Some("-123".to_string()),
        }
        .into_request(sample_request());

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["userAgent"], "antigravity");
        assert_eq!(value["requestType"], "agent");
        assert_eq!(value["project"], "project-1");
        assert_eq!(value["request"]["sessionId"], "-123");
    }

    #[test]
    fn into_request_without_session_leaves_request_untouched() {
        let body = CodeAssistRequestMeta {
            project: "p".to_string(),
            request_id: "r".to_string(),
            model: "m".to_string(),
            session_id: None,
        }
        .into_request(sample_request());

        assert!(body.request.extra.get("sessionId").is_none());
    }
}
