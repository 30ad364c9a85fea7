use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use ahash::AHashMap;
use moka::sync::Cache;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::endpoints::{OAuthClientSettings, OAuthEndpoints, tokens_from_response};
use super::pkce::PkceGenerator;
use super::state::OAuthStateCodec;
use super::store::{TokenStore, clear_tokens, load_tokens, save_tokens};
use crate::error::{CastorError, IsRecoverable};
use crate::providers::ProjectResolver;
use crate::types::{OAuthState, OAuthTokens, ProjectInfo, ProviderConfig, TokenField};

/// Authorizations not completed within this window are forgotten.
const PENDING_STATE_TTL: Duration = Duration::from_secs(10 * 60);
const PENDING_STATE_CAPACITY: u64 = 1_024;

/// Per-provider authentication lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Error(String),
}

/// Failure recorded by a refresh so callers queued behind it can reuse it.
#[derive(Debug, Clone)]
struct RefreshFailure {
    message: String,
    recoverable: bool,
}

type RefreshOutcome = Result<String, RefreshFailure>;

type AuthStates = Arc<Mutex<AHashMap<String, AuthState>>>;

fn record_state(states: &AuthStates, provider_id: &str, state: AuthState) {
    debug!(provider = %provider_id, state = ?state, "[OAuth] state transition");
    states
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(provider_id.to_string(), state);
}

/// Serializes refreshes for one provider.
///
/// `generation` is bumped after every completed refresh. A caller that observed
/// an older generation before acquiring `last` knows a refresh finished while it
/// waited and reuses the recorded outcome. The refresh task owns the guard, so
/// the outcome is recorded even when the caller that started it goes away.
#[derive(Default)]
struct RefreshSlot {
    generation: AtomicU64,
    last: Arc<tokio::sync::Mutex<Option<RefreshOutcome>>>,
}

/// One token refresh with everything it touches owned by the task.
struct RefreshJob {
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    states: AuthStates,
    settings: Arc<OAuthClientSettings>,
    redirect_uri: Url,
    provider_id: String,
    current: OAuthTokens,
}

impl RefreshJob {
    async fn run(self) -> Result<String, CastorError> {
        let provider_id = self.provider_id.as_str();
        let Some(refresh_token) = self.current.refresh_token.as_deref() else {
            return Err(CastorError::AuthRequired);
        };

        info!(provider = %provider_id, "[OAuth] refreshing access token");
        match OAuthEndpoints::refresh_access_token(
            &self.settings,
            &self.redirect_uri,
            refresh_token,
            &self.http,
        )
        .await
        {
            Ok(response) => {
                let tokens = tokens_from_response(&response, Some(&self.current));
                save_tokens(self.store.as_ref(), provider_id, &tokens).await?;
                record_state(&self.states, provider_id, AuthState::Authenticated);
                Ok(tokens.access_token)
            }
            Err(err) => {
                let recoverable = err.is_recoverable();
                warn!(provider = %provider_id, recoverable, error = %err, "[OAuth] refresh failed");
                if !recoverable {
                    self.store
                        .clear(provider_id, TokenField::RefreshToken)
                        .await?;
                }
                let err = err.into_refresh_error();
                record_state(&self.states, provider_id, AuthState::Error(err.to_string()));
                Err(err)
            }
        }
    }
}

/// Orchestrates PKCE authorization, token persistence and refresh for every
/// OAuth provider. Construct once and share through `Arc`.
pub struct OAuthManager {
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    resolver: Arc<ProjectResolver>,
    app_scheme: String,
    clients: RwLock<AHashMap<String, Arc<OAuthClientSettings>>>,
    pending: Cache<String, OAuthState>,
    states: AuthStates,
    refresh_slots: Mutex<AHashMap<String, Arc<RefreshSlot>>>,
}

impl OAuthManager {
    pub fn new(
        http: reqwest::Client,
        store: Arc<dyn TokenStore>,
        resolver: Arc<ProjectResolver>,
        app_scheme: impl Into<String>,
    ) -> Self {
        Self {
            http,
            store,
            resolver,
            app_scheme: app_scheme.into(),
            clients: RwLock::new(AHashMap::new()),
            pending: Cache::builder()
                .max_capacity(PENDING_STATE_CAPACITY)
                .time_to_live(PENDING_STATE_TTL)
                .build(),
            states: Arc::new(Mutex::new(AHashMap::new())),
            refresh_slots: Mutex::new(AHashMap::new()),
        }
    }

    pub fn register_client(&self, provider_id: impl Into<String>, settings: OAuthClientSettings) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider_id.into(), Arc::new(settings));
    }

    pub fn resolver(&self) -> &Arc<ProjectResolver> {
        &self.resolver
    }

    /// `<app_scheme>://oauth/<provider_id>`.
    pub fn redirect_uri(&self, provider_id: &str) -> Result<Url, CastorError> {
        Ok(Url::parse(&format!(
            "{}://oauth/{provider_id}",
            self.app_scheme
        ))?)
    }

    pub fn auth_state(&self, provider_id: &str) -> AuthState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_id)
            .cloned()
            .unwrap_or_default()
    }

    fn set_state(&self, provider_id: &str, state: AuthState) {
        record_state(&self.states, provider_id, state);
    }

    fn client_settings(&self, provider_id: &str) -> Result<Arc<OAuthClientSettings>, CastorError> {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_id)
            .cloned()
            .ok_or_else(|| CastorError::OauthNotConfigured(provider_id.to_string()))
    }

    fn refresh_slot(&self, provider_id: &str) -> Arc<RefreshSlot> {
        self.refresh_slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(provider_id.to_string())
            .or_default()
            .clone()
    }

    /// Begin an authorization and return the URL to open in the browser.
    pub fn start_auth_flow(
        &self,
        config: &ProviderConfig,
        project_id_hint: Option<&str>,
    ) -> Result<Url, CastorError> {
        let provider_id = config.id.as_str();
        let settings = self.client_settings(provider_id)?;
        let redirect_uri = self.redirect_uri(provider_id)?;

        let pkce = PkceGenerator::generate();
        let state = OAuthState {
            verifier: pkce.verifier.clone(),
            provider_id: provider_id.to_string(),
            project_id_hint: project_id_hint
                .map(str::trim)
                .filter(|hint| !hint.is_empty())
                .map(str::to_string),
            nonce: Uuid::new_v4().to_string(),
        };

        let url = OAuthEndpoints::build_authorize_url(
            &settings,
            &redirect_uri,
            &pkce,
            &OAuthStateCodec::encode(&state),
        );

        self.pending.insert(state.nonce.clone(), state);
        self.set_state(provider_id, AuthState::Authenticating);
        info!(provider = %provider_id, "[OAuth] authorization started");
        Ok(url)
    }

    /// Complete an authorization from the deep link the browser redirected to.
    pub async fn handle_callback(&self, uri: &str) -> Result<OAuthTokens, CastorError> {
        let url = Url::parse(uri)
            .map_err(|err| CastorError::InvalidCallback(format!("unparseable callback: {err}")))?;
        let params: AHashMap<String, String> = url.query_pairs().into_owned().collect();
        let path_provider = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
            .map(str::to_string);

        if let Some(error) = params.get("error") {
            let pending = params
                .get("state")
                .and_then(|raw| OAuthStateCodec::decode(raw).ok())
                .and_then(|state| self.pending.remove(&state.nonce));
            if let Some(state) = pending {
                self.set_state(&state.provider_id, AuthState::Unauthenticated);
            }
            let description = params
                .get("error_description")
                .map_or_else(|| error.clone(), |desc| format!("{error}: {desc}"));
            warn!(error = %description, "[OAuth] authorization denied by user or server");
            return Err(CastorError::AuthorizationDenied(description));
        }

        let code = params
            .get("code")
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| CastorError::InvalidCallback("missing code".to_string()))?;
        let raw_state = params
            .get("state")
            .map(|state| state.trim())
            .filter(|state| !state.is_empty())
            .ok_or_else(|| CastorError::InvalidCallback("missing state".to_string()))?;

        let decoded = OAuthStateCodec::decode(raw_state).map_err(|err| {
            warn!(error = %err, "[OAuth] undecodable state on callback");
            CastorError::InvalidState
        })?;

        let Some(state) = self.pending.remove(&decoded.nonce) else {
            warn!(provider = %decoded.provider_id, "[OAuth] callback with unknown or reused nonce");
            return Err(CastorError::InvalidState);
        };

        let provider_id = state.provider_id.clone();
        if path_provider
            .as_deref()
            .is_some_and(|path| path != provider_id)
        {
            warn!(
                provider = %provider_id,
                path = ?path_provider,
                "[OAuth] callback path names a different provider"
            );
            self.set_state(&provider_id, AuthState::Error("state mismatch".to_string()));
            return Err(CastorError::InvalidState);
        }

        match self.exchange(&state, code).await {
            Ok(tokens) => {
                self.set_state(&provider_id, AuthState::Authenticated);
                info!(
                    provider = %provider_id,
                    has_refresh_token = tokens.refresh_token.is_some(),
                    "[OAuth] authorization completed"
                );
                Ok(tokens)
            }
            Err(err) => {
                warn!(provider = %provider_id, error = %err, "[OAuth] code exchange failed");
                self.set_state(&provider_id, AuthState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn exchange(&self, state: &OAuthState, code: &str) -> Result<OAuthTokens, CastorError> {
        let settings = self.client_settings(&state.provider_id)?;
        let redirect_uri = self.redirect_uri(&state.provider_id)?;

        let response = OAuthEndpoints::exchange_authorization_code(
            &settings,
            &redirect_uri,
            code,
            &state.verifier,
            &self.http,
        )
        .await
        .map_err(|err| err.into_exchange_error())?;

        let mut tokens = tokens_from_response(&response, None);
        tokens.project_id = state.project_id_hint.clone();
        save_tokens(self.store.as_ref(), &state.provider_id, &tokens).await?;
        Ok(tokens)
    }

    /// Read-only snapshot of the stored tokens.
    pub async fn tokens(&self, provider_id: &str) -> Result<Option<OAuthTokens>, CastorError> {
        load_tokens(self.store.as_ref(), provider_id).await
    }

    /// A non-expired access token, refreshing at most once across concurrent callers.
    pub async fn get_valid_access_token(&self, provider_id: &str) -> Result<String, CastorError> {
        let tokens = self
            .tokens(provider_id)
            .await?
            .ok_or(CastorError::AuthRequired)?;

        if tokens.needs_refresh() {
            return self.refresh_single_flight(provider_id).await;
        }
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }
        debug!(provider = %provider_id, "[OAuth] token expired without refresh token");
        Err(CastorError::AuthRequired)
    }

    async fn refresh_single_flight(&self, provider_id: &str) -> Result<String, CastorError> {
        let slot = self.refresh_slot(provider_id);
        let observed = slot.generation.load(Ordering::Acquire);
        let last = slot.last.clone().lock_owned().await;

        if slot.generation.load(Ordering::Acquire) != observed {
            if let Some(outcome) = last.as_ref() {
                debug!(provider = %provider_id, "[OAuth] reusing concurrent refresh outcome");
                return outcome.clone().map_err(|failure| CastorError::RefreshFailed {
                    message: failure.message,
                    recoverable: failure.recoverable,
                });
            }
        }

        // Another path may have stored fresh tokens while we waited.
        let tokens = self
            .tokens(provider_id)
            .await?
            .ok_or(CastorError::AuthRequired)?;
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }
        if tokens.refresh_token.is_none() {
            return Err(CastorError::AuthRequired);
        }

        let job = RefreshJob {
            http: self.http.clone(),
            store: self.store.clone(),
            states: self.states.clone(),
            settings: self.client_settings(provider_id)?,
            redirect_uri: self.redirect_uri(provider_id)?,
            provider_id: provider_id.to_string(),
            current: tokens,
        };
        let task = tokio::spawn(async move {
            let mut last = last;
            let result = job.run().await;
            *last = Some(match &result {
                Ok(access_token) => Ok(access_token.clone()),
                Err(err) => Err(RefreshFailure {
                    message: err.to_string(),
                    recoverable: err.is_recoverable(),
                }),
            });
            slot.generation.fetch_add(1, Ordering::Release);
            result
        });

        task.await.unwrap_or_else(|err| {
            Err(CastorError::RefreshFailed {
                message: format!("refresh task failed: {err}"),
                recoverable: true,
            })
        })
    }

    /// Resolve the Code Assist project for `provider_id`, persisting a discovered id.
    pub async fn resolve_project(
        &self,
        provider_id: &str,
        access_token: &str,
    ) -> Result<ProjectInfo, CastorError> {
        let hint = self.store.get(provider_id, TokenField::ProjectId).await?;
        let info = self
            .resolver
            .resolve(provider_id, access_token, hint.as_deref())
            .await;

        if !info.fallback && hint.as_deref() != Some(info.project_id.as_str()) {
            self.store
                .set(provider_id, TokenField::ProjectId, &info.project_id)
                .await?;
        }
        Ok(info)
    }

    /// Forget resolved project metadata, e.g. after a 401/403.
    pub fn invalidate_project(&self, provider_id: &str) {
        self.resolver.invalidate(provider_id);
    }

    pub async fn logout(&self, provider_id: &str) -> Result<(), CastorError> {
        clear_tokens(self.store.as_ref(), provider_id).await?;
        self.resolver.invalidate(provider_id);
        self.set_state(provider_id, AuthState::Unauthenticated);
        info!(provider = %provider_id, "[OAuth] logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgenticConfig;
    use crate::oauth::MemoryTokenStore;
    use crate::types::ProviderKind;

    fn manager() -> OAuthManager {
        let http = reqwest::Client::new();
        let resolver = Arc::new(ProjectResolver::new(
            http.clone(),
            Arc::new(AgenticConfig::default().resolve()),
            Duration::from_secs(5),
        ));
        OAuthManager::new(http, Arc::new(MemoryTokenStore::new()), resolver, "castor")
    }

    fn settings() -> OAuthClientSettings {
        AgenticConfig::default().resolve().oauth_client_settings()
    }

    fn provider() -> ProviderConfig {
        ProviderConfig::new(
            "agentic",
            ProviderKind::Agentic,
            Url::parse("https://cloudcode-pa.googleapis.com").unwrap(),
        )
    }

    #[test]
    fn unregistered_provider_is_not_configured() {
        let err = manager().start_auth_flow(&provider(), None).unwrap_err();
        assert!(matches!(err, CastorError::OauthNotConfigured(id) if id == "agentic"));
    }

    #[test]
    fn start_auth_flow_registers_pending_state() {
        let manager = manager();
        manager.register_client("agentic", settings());

        let url = manager.start_auth_flow(&provider(), Some("hint")).unwrap();
        let params: AHashMap<String, String> = url.query_pairs().into_owned().collect();
        let state = OAuthStateCodec::decode(&params["state"]).unwrap();

        assert_eq!(params["redirect_uri"], "castor://oauth/agentic");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(state.project_id_hint.as_deref(), Some("hint"));
        assert!(manager.pending.contains_key(&state.nonce));
        assert_eq!(manager.auth_state("agentic"), AuthState::Authenticating);
    }

    #[tokio::test]
    async fn callback_errors_are_classified() {
        let manager = manager();
        manager.register_client("agentic", settings());

        assert!(matches!(
            manager.handle_callback("not a uri").await,
            Err(CastorError::InvalidCallback(_))
        ));
        assert!(matches!(
            manager.handle_callback("castor://oauth/agentic?state=abc").await,
            Err(CastorError::InvalidCallback(_))
        ));
        assert!(matches!(
            manager
                .handle_callback("castor://oauth/agentic?code=c&state=%25%25")
                .await,
            Err(CastorError::InvalidState)
        ));
    }

    #[tokio::test]
    async fn consent_cancelled_drops_pending_state() {
        let manager = manager();
        manager.register_client("agentic", settings());
        let url = manager.start_auth_flow(&provider(), None).unwrap();
        let params: AHashMap<String, String> = url.query_pairs().into_owned().collect();
        let nonce = OAuthStateCodec::decode(&params["state"]).unwrap().nonce;

        let mut callback = Url::parse("castor://oauth/agentic").unwrap();
        callback
            .query_pairs_mut()
            .append_pair("error", "access_denied")
            .append_pair("state", &params["state"]);

        let err = manager.handle_callback(callback.as_str()).await.unwrap_err();
        assert!(matches!(err, CastorError::AuthorizationDenied(msg) if msg.contains("access_denied")));
        assert!(!manager.pending.contains_key(&nonce));
        assert_eq!(manager.auth_state("agentic"), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn mismatched_callback_path_is_rejected() {
        let manager = manager();
        manager.register_client("agentic", settings());
        let url = manager.start_auth_flow(&provider(), None).unwrap();
        let params: AHashMap<String, String> = url.query_pairs().into_owned().collect();

        let mut callback = Url::parse("castor://oauth/someone-else").unwrap();
        callback
            .query_pairs_mut()
            .append_pair("code", "4/abc")
            .append_pair("state", &params["state"]);

        assert!(matches!(
            manager.handle_callback(callback.as_str()).await,
            Err(CastorError::InvalidState)
        ));
        assert!(matches!(manager.auth_state("agentic"), AuthState::Error(_)));
    }

    #[tokio::test]
    async fn missing_tokens_require_auth() {
        assert!(matches!(
            manager().get_valid_access_token("agentic").await,
            Err(CastorError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_network() {
        let manager = manager();
        let tokens = OAuthTokens {
            access_token: "cached".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: chrono::Utc::now().timestamp_millis() + 3_600_000,
            token_type: "Bearer".to_string(),
            email: None,
            project_id: None,
        };
        save_tokens(manager.store.as_ref(), "agentic", &tokens)
            .await
            .unwrap();

        assert_eq!(
            manager.get_valid_access_token("agentic").await.unwrap(),
            "cached"
        );
    }

    #[tokio::test]
    async fn expired_without_refresh_token_requires_auth() {
        let manager = manager();
        let tokens = OAuthTokens {
            access_token: "stale".to_string(),
            refresh_token: None,
            expires_at: 0,
            token_type: "Bearer".to_string(),
            email: None,
            project_id: None,
        };
        save_tokens(manager.store.as_ref(), "agentic", &tokens)
            .await
            .unwrap();

        assert!(matches!(
            manager.get_valid_access_token("agentic").await,
            Err(CastorError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn logout_clears_tokens_and_state() {
        let manager = manager();
        manager
            .store
            .set("agentic", TokenField::AccessToken, "a")
            .await
            .unwrap();
        manager.set_state("agentic", AuthState::Authenticated);

        manager.logout("agentic").await.unwrap();
        assert!(manager.tokens("agentic").await.unwrap().is_none());
        assert_eq!(manager.auth_state("agentic"), AuthState::Unauthenticated);
    }
}
