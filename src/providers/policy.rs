use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::CastorError;
use crate::utils::logging::{truncate_body, with_pretty_json_debug};

/// Human-readable message from the usual error body shapes:
/// `{"error":{"message":..}}` (OpenAI, Gemini), `{"error":".."}` (Ollama)
/// and `{"message":..}`.
fn structured_message(body: &Value) -> Option<String> {
    let message = match body.get("error") {
        Some(Value::String(message)) => Some(message.as_str()),
        Some(error) => error.get("message").and_then(Value::as_str),
        None => body.get("message").and_then(Value::as_str),
    }?;
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

/// Turn a non-2xx response into [`CastorError::HttpFailure`].
///
/// The body is read fully; when it carries a structured error its message is
/// kept, otherwise a truncated preview of the raw text.
pub(crate) async fn http_failure(resp: reqwest::Response) -> CastorError {
    let status = resp.status();
    let bytes = resp.bytes().await.unwrap_or_default();
    failure_from_body(status, &bytes)
}

/// [`http_failure`] for a body that was already read.
pub(crate) fn failure_from_body(status: StatusCode, bytes: &[u8]) -> CastorError {
    if let Ok(json) = serde_json::from_slice::<Value>(bytes)
        && let Some(message) = structured_message(&json)
    {
        with_pretty_json_debug(&json, |pretty| {
            debug!(%status, body = %pretty, "Upstream structured error");
        });
        return CastorError::HttpFailure {
            status: status.as_u16(),
            body: message,
        };
    }

    let raw = String::from_utf8_lossy(bytes);
    let preview = truncate_body(raw.trim());
    debug!(%status, body = %preview, "Upstream unstructured error");

    CastorError::HttpFailure {
        status: status.as_u16(),
        body: if preview.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            preview
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_and_flat_messages() {
        assert_eq!(
            structured_message(&json!({"error": {"message": "quota", "code": 429}})).as_deref(),
            Some("quota")
        );
        assert_eq!(
            structured_message(&json!({"error": "model not found"})).as_deref(),
            Some("model not found")
        );
        assert_eq!(
            structured_message(&json!({"message": "Unauthorized"})).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(structured_message(&json!({"error": {"code": 500}})), None);
        assert_eq!(structured_message(&json!({"error": "  "})), None);
    }
}
