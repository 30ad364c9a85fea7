use super::IsRecoverable;
use super::castor::CastorError;
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use reqwest::StatusCode;
use thiserror::Error as ThisError;

/// Token-endpoint and discovery failures, before they are mapped onto the
/// caller-facing [`CastorError`] variants.
#[derive(Debug, ThisError)]
pub enum OauthError {
    #[error("OAuth2 request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OAuth2 upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("OAuth2 server response error: {error}{}", description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    ServerResponse {
        error: String,
        description: Option<String>,
    },

    #[error("OAuth2 token endpoint parse error: {message}. Body: {body}")]
    Parse { message: String, body: String },

    #[error("OAuth2 unexpected error: {message}")]
    Other { message: String },
}

impl OauthError {
    /// Server error codes that no amount of retrying will fix.
    const TERMINAL_CODES: [&str; 5] = [
        "invalid_grant",
        "invalid_client",
        "unauthorized_client",
        "unsupported_grant_type",
        "invalid_scope",
    ];

    pub fn into_exchange_error(self) -> CastorError {
        CastorError::TokenExchangeFailed {
            recoverable: self.is_recoverable(),
            message: self.to_string(),
        }
    }

    pub fn into_refresh_error(self) -> CastorError {
        CastorError::RefreshFailed {
            recoverable: self.is_recoverable(),
            message: self.to_string(),
        }
    }
}

impl IsRecoverable for OauthError {
    fn is_recoverable(&self) -> bool {
        match self {
            OauthError::Request(_) => true,
            OauthError::UpstreamStatus(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            OauthError::ServerResponse { error, .. } => {
                !Self::TERMINAL_CODES.contains(&error.as_str())
            }
            OauthError::Parse { .. } => true,
            OauthError::Other { .. } => false,
        }
    }
}

type PkgsRequestTokenError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

impl From<PkgsRequestTokenError> for OauthError {
    fn from(e: PkgsRequestTokenError) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => OauthError::ServerResponse {
                error: err.error().to_string(),
                description: err.error_description().cloned(),
            },
            RequestTokenError::Request(wrapper) => match wrapper {
                oauth2::HttpClientError::Reqwest(real_err) => OauthError::Request(*real_err),
                other => OauthError::Other {
                    message: format!("HttpClientError: {other:?}"),
                },
            },
            RequestTokenError::Parse(parse_err, body) => {
                let body_str = String::from_utf8_lossy(&body);
                let body = body_str
                    .char_indices()
                    .nth(100)
                    .map(|(idx, _)| format!("{}...<truncated>", &body_str[..idx]))
                    .unwrap_or_else(|| body_str.into_owned());
                OauthError::Parse {
                    message: parse_err.to_string(),
                    body,
                }
            }
            RequestTokenError::Other(s) => OauthError::Other { message: s },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(error: &str) -> OauthError {
        OauthError::ServerResponse {
            error: error.to_string(),
            description: None,
        }
    }

    #[test]
    fn invalid_grant_is_terminal() {
        assert!(!server("invalid_grant").is_recoverable());
        assert!(!server("invalid_client").is_recoverable());
    }

    #[test]
    fn transient_server_errors_are_recoverable() {
        assert!(server("temporarily_unavailable").is_recoverable());
        assert!(OauthError::UpstreamStatus(StatusCode::TOO_MANY_REQUESTS).is_recoverable());
        assert!(OauthError::UpstreamStatus(StatusCode::BAD_GATEWAY).is_recoverable());
        assert!(!OauthError::UpstreamStatus(StatusCode::FORBIDDEN).is_recoverable());
    }

    #[test]
    fn refresh_mapping_carries_recoverability() {
        match server("invalid_grant").into_refresh_error() {
            CastorError::RefreshFailed {
                message,
                recoverable,
            } => {
                assert!(!recoverable);
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn server_response_display_includes_description() {
        let err = OauthError::ServerResponse {
            error: "invalid_grant".to_string(),
            description: Some("Bad Request".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "OAuth2 server response error: invalid_grant (Bad Request)"
        );
    }
}
