use chrono::Utc;
use oauth2::{
    AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RefreshToken, Scope,
    TokenResponse,
};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::pkce::PkcePair;
use crate::error::OauthError;
use crate::oauth_utils::{OauthTokenResponse, code_flow_client, token_type_name};
use crate::types::OAuthTokens;
use crate::utils::jwt::email_from_id_token;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(3600);

/// OAuth client registration for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClientSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: Url,
    pub token_url: Url,
    pub scopes: Vec<String>,
    /// Appended verbatim to the authorization URL (e.g. `access_type=offline`).
    pub extra_params: Vec<(String, String)>,
}

/// Stateless calls against one provider's authorization server. The redirect
/// URI is per provider, so a client is built for every call.
pub(crate) struct OAuthEndpoints;

impl OAuthEndpoints {
    /// Authorization URL carrying our own `state` and the pair's S256 challenge.
    pub(crate) fn build_authorize_url(
        settings: &OAuthClientSettings,
        redirect_uri: &Url,
        pkce: &PkcePair,
        state: &str,
    ) -> Url {
        let client = code_flow_client(settings, redirect_uri);
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            pkce.verifier.clone(),
        ));
        let state = state.to_string();
        let request = settings.scopes.iter().fold(
            client
                .authorize_url(move || CsrfToken::new(state))
                .set_pkce_challenge(challenge),
            |request, scope| request.add_scope(Scope::new(scope.clone())),
        );
        let request = settings
            .extra_params
            .iter()
            .fold(request, |request, (name, value)| {
                request.add_extra_param(name.as_str(), value.as_str())
            });

        request.url().0
    }

    /// `authorization_code` grant with the PKCE verifier.
    pub(crate) async fn exchange_authorization_code(
        settings: &OAuthClientSettings,
        redirect_uri: &Url,
        code: &str,
        verifier: &str,
        http: &reqwest::Client,
    ) -> Result<OauthTokenResponse, OauthError> {
        debug!(token_url = %settings.token_url, "[OAuth] exchanging authorization code");
        let response = code_flow_client(settings, redirect_uri)
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()))
            .request_async(http)
            .await?;
        info!(token_url = %settings.token_url, "[OAuth] authorization code exchanged");
        Ok(response)
    }

    pub(crate) async fn refresh_access_token(
        settings: &OAuthClientSettings,
        redirect_uri: &Url,
        refresh_token: &str,
        http: &reqwest::Client,
    ) -> Result<OauthTokenResponse, OauthError> {
        Ok(code_flow_client(settings, redirect_uri)
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http)
            .await?)
    }
}

/// Turn a token endpoint response into stored tokens.
///
/// `previous` supplies the refresh token, email and project when the response
/// does not carry them.
pub(crate) fn tokens_from_response(
    response: &OauthTokenResponse,
    previous: Option<&OAuthTokens>,
) -> OAuthTokens {
    let expires_in = response.expires_in().unwrap_or(DEFAULT_EXPIRES_IN);
    let expires_in_ms = i64::try_from(expires_in.as_millis()).unwrap_or(i64::MAX);

    let refresh_token = response
        .refresh_token()
        .map(|token| token.secret().clone())
        .filter(|token| !token.trim().is_empty())
        .or_else(|| previous.and_then(|prev| prev.refresh_token.clone()));

    let email = response
        .extra_fields()
        .id_token
        .as_deref()
        .and_then(email_from_id_token)
        .or_else(|| previous.and_then(|prev| prev.email.clone()));

    OAuthTokens {
        access_token: response.access_token().secret().clone(),
        refresh_token,
        expires_at: Utc::now().timestamp_millis().saturating_add(expires_in_ms),
        token_type: token_type_name(response.token_type()),
        email,
        project_id: previous.and_then(|prev| prev.project_id.clone()),
    }
}
