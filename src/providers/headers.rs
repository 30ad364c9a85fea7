use std::collections::BTreeMap;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::warn;

use crate::error::CastorError;

pub(crate) const CODE_ASSIST_USER_AGENT: &str = "antigravity/1.16.5 linux/amd64";
const CODE_ASSIST_API_CLIENT: &str = "google-cloud-sdk vscode_cloudshelleditor/0.1";
const CODE_ASSIST_CLIENT_METADATA: &str =
    "ideType=ANTIGRAVITY,platform=PLATFORM_UNSPECIFIED,pluginType=GEMINI";

const GOOG_API_KEY: HeaderName = HeaderName::from_static("x-goog-api-key");
const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
const ANTHROPIC_VERSION: HeaderName = HeaderName::from_static("anthropic-version");
const GOOG_API_CLIENT: HeaderName = HeaderName::from_static("x-goog-api-client");
const CLIENT_METADATA: HeaderName = HeaderName::from_static("client-metadata");

fn secret_value(raw: &str) -> Result<HeaderValue, CastorError> {
    let mut value = HeaderValue::from_str(raw)
        .map_err(|_| CastorError::Config("credential contains invalid header characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

pub(crate) fn bearer(headers: &mut HeaderMap, token: &str) -> Result<(), CastorError> {
    headers.insert(AUTHORIZATION, secret_value(&format!("Bearer {token}"))?);
    Ok(())
}

pub(crate) fn goog_api_key(headers: &mut HeaderMap, key: &str) -> Result<(), CastorError> {
    headers.insert(GOOG_API_KEY, secret_value(key)?);
    Ok(())
}

/// Anthropic accepts the OpenAI bearer form on chat, but model listing wants its own pair.
pub(crate) fn anthropic_key(headers: &mut HeaderMap, key: &str) -> Result<(), CastorError> {
    headers.insert(X_API_KEY, secret_value(key)?);
    headers.insert(ANTHROPIC_VERSION, HeaderValue::from_static("2023-06-01"));
    Ok(())
}

/// Client identification bundle every Code Assist call carries.
pub(crate) fn code_assist_bundle(headers: &mut HeaderMap) {
    headers.insert(USER_AGENT, HeaderValue::from_static(CODE_ASSIST_USER_AGENT));
    headers.insert(GOOG_API_CLIENT, HeaderValue::from_static(CODE_ASSIST_API_CLIENT));
    headers.insert(
        CLIENT_METADATA,
        HeaderValue::from_static(CODE_ASSIST_CLIENT_METADATA),
    );
}

/// User-configured headers go last and override anything set before them.
pub(crate) fn apply_custom(headers: &mut HeaderMap, custom: &BTreeMap<String, String>) {
    for (name, value) in custom {
        let parsed = HeaderName::from_bytes(name.trim().as_bytes())
            .ok()
            .zip(HeaderValue::from_str(value.trim()).ok());
        match parsed {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => warn!(header = %name, "Skipping custom header with invalid name or value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_is_sensitive() {
        let mut headers = HeaderMap::new();
        bearer(&mut headers, "tok").unwrap();
        let value = &headers[AUTHORIZATION];
        assert_eq!(value, "Bearer tok");
        assert!(value.is_sensitive());
    }

    #[test]
    fn bundle_identifies_client() {
        let mut headers = HeaderMap::new();
        code_assist_bundle(&mut headers);
        assert_eq!(headers[USER_AGENT], CODE_ASSIST_USER_AGENT);
        assert_eq!(headers["x-goog-api-client"], CODE_ASSIST_API_CLIENT);
        assert!(
            headers["client-metadata"]
                .to_str()
                .unwrap()
                .contains("ideType=ANTIGRAVITY")
        );
    }

    #[test]
    fn custom_headers_override_and_skip_invalid() {
        let mut headers = HeaderMap::new();
        code_assist_bundle(&mut headers);
        let custom = BTreeMap::from([
            ("User-Agent".to_string(), "mine/1.0".to_string()),
            ("bad header".to_string(), "x".to_string()),
            ("X-Trace".to_string(), "line\nbreak".to_string()),
            ("X-Team".to_string(), "mobile".to_string()),
        ]);

        apply_custom(&mut headers, &custom);

        assert_eq!(headers[USER_AGENT], "mine/1.0");
        assert_eq!(headers["x-team"], "mobile");
        assert!(!headers.contains_key("x-trace"));
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn invalid_credential_is_config_error() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            bearer(&mut headers, "bad\ntoken"),
            Err(CastorError::Config(_))
        ));
    }
}
