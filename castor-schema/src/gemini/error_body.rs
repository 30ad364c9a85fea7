use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Google-style error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiErrorBody {
    pub error: GeminiErrorObject,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeminiErrorObject {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl GeminiErrorObject {
    /// Whether the failure is worth retrying by the caller (429 or 5xx).
    pub fn is_transient(&self) -> bool {
        match self.code {
            Some(code) => code == 429 || code >= 500,
            None => matches!(
                self.status.as_deref(),
                Some("RESOURCE_EXHAUSTED" | "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quota_error_is_transient() {
        let body: GeminiErrorBody = serde_json::from_value(json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        }))
        .unwrap();
        assert!(body.error.is_transient());
        assert_eq!(body.error.message.as_deref(), Some("Quota exceeded"));
    }

    #[test]
    fn status_only_errors_use_the_status_name() {
        let unavailable = GeminiErrorObject {
            status: Some("UNAVAILABLE".to_string()),
            ..Default::default()
        };
        let denied = GeminiErrorObject {
            status: Some("PERMISSION_DENIED".to_string()),
            ..Default::default()
        };
        assert!(unavailable.is_transient());
        assert!(!denied.is_transient());
    }
}
