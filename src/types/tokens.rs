use std::fmt;

use chrono::Utc;

/// Access tokens are treated as expired this long before their real expiry.
const EXPIRY_SKEW_MS: i64 = 60_000;

/// Token material persisted per provider.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Epoch milliseconds.
    pub expires_at: i64,
    pub token_type: String,
    pub email: Option<String>,
    pub project_id: Option<String>,
}

impl OAuthTokens {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at - EXPIRY_SKEW_MS
    }

    pub fn needs_refresh(&self) -> bool {
        self.is_expired() && self.refresh_token.is_some()
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("email", &self.email)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Per-provider keys understood by a [`crate::oauth::TokenStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    AccessToken,
    RefreshToken,
    ExpiresAt,
    Email,
    ProjectId,
}

impl TokenField {
    pub const ALL: [TokenField; 5] = [
        TokenField::AccessToken,
        TokenField::RefreshToken,
        TokenField::ExpiresAt,
        TokenField::Email,
        TokenField::ProjectId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenField::AccessToken => "access_token",
            TokenField::RefreshToken => "refresh_token",
            TokenField::ExpiresAt => "expires_at",
            TokenField::Email => "email",
            TokenField::ProjectId => "project_id",
        }
    }
}

/// An authorization in flight, keyed by `nonce` until its callback arrives.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub verifier: String,
    pub provider_id: String,
    pub project_id_hint: Option<String>,
    pub nonce: String,
}

impl fmt::Debug for OAuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthState")
            .field("verifier", &"<redacted>")
            .field("provider_id", &self.provider_id)
            .field("project_id_hint", &self.project_id_hint)
            .field("nonce", &self.nonce)
            .finish()
    }
}
