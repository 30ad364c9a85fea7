use std::fmt;

use thiserror::Error as ThisError;

use super::IsRecoverable;
use crate::types::{ErrorCode, UnifiedStreamEvent};

/// Which stage of the HTTP exchange failed before a response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Other => "transport",
        })
    }
}

#[derive(Debug, ThisError)]
pub enum CastorError {
    #[error("Authentication required; sign in again")]
    AuthRequired,

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String, recoverable: bool },

    #[error("Token refresh failed: {message}")]
    RefreshFailed { message: String, recoverable: bool },

    #[error("Invalid or unknown OAuth state")]
    InvalidState,

    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("OAuth is not configured for provider {0}")]
    OauthNotConfigured(String),

    #[error("Network {kind} error: {message}")]
    Transport { kind: TransportKind, message: String },

    #[error("Upstream error with status {status}: {body}")]
    HttpFailure { status: u16, body: String },

    #[error("Stream ended without any content")]
    EmptyStream,

    #[error("Failed to parse upstream response: {0}")]
    ParseFailure(String),

    #[error(
        "Expected JSON from {url} but got {content_type}; check the provider base URL. Body starts with: {preview}"
    )]
    NonJsonResponse {
        url: String,
        content_type: String,
        preview: String,
    },

    #[error("Token store error: {0}")]
    TokenStore(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CastorError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        };
        CastorError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

impl CastorError {
    /// Stream error code this failure is reported under.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CastorError::AuthRequired
            | CastorError::TokenExchangeFailed { .. }
            | CastorError::RefreshFailed { .. }
            | CastorError::OauthNotConfigured(_) => Some(ErrorCode::AuthRequired),
            CastorError::Transport { kind, .. } => Some(match kind {
                TransportKind::Timeout => ErrorCode::Timeout,
                TransportKind::Connect => ErrorCode::Connect,
                TransportKind::Other => ErrorCode::Transport,
            }),
            CastorError::HttpFailure { status, .. } => Some(ErrorCode::Http(*status)),
            CastorError::EmptyStream => Some(ErrorCode::EmptyStream),
            CastorError::ParseFailure(_)
            | CastorError::NonJsonResponse { .. }
            | CastorError::Json(_) => Some(ErrorCode::Parse),
            _ => None,
        }
    }
}

impl IsRecoverable for CastorError {
    fn is_recoverable(&self) -> bool {
        match self {
            CastorError::AuthRequired | CastorError::EmptyStream => true,
            CastorError::TokenExchangeFailed { recoverable, .. }
            | CastorError::RefreshFailed { recoverable, .. } => *recoverable,
            CastorError::Transport { kind, .. } => *kind != TransportKind::Other,
            CastorError::HttpFailure { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<CastorError> for UnifiedStreamEvent {
    fn from(err: CastorError) -> Self {
        UnifiedStreamEvent::Error {
            code: err.code(),
            recoverable: err.is_recoverable(),
            message: err.to_string(),
        }
    }
}
