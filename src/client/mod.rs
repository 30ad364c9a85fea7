//! Caller-facing facade over streaming, model listing and one-shot completion.

mod completion;
mod models;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{AgenticResolvedConfig, BasicConfig, Config};
use crate::error::CastorError;
use crate::oauth::{OAuthManager, TokenStore};
use crate::providers::ProjectResolver;
use crate::stream::{EventStream, StreamController};
use crate::types::{ChatRequest, ProviderKind};

/// Upper bound for one project-discovery probe.
const PROJECT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ChatClient {
    http: reqwest::Client,
    oauth: Arc<OAuthManager>,
    agentic: Arc<AgenticResolvedConfig>,
    controller: StreamController,
    request_timeout: Duration,
}

impl ChatClient {
    /// Wire everything from `config`: one HTTP client, one project resolver,
    /// one OAuth manager with the Code Assist client registered for every
    /// agentic provider.
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self, CastorError> {
        let http = config.basic.build_http_client()?;
        let agentic = Arc::new(config.agentic());
        let resolver = Arc::new(ProjectResolver::new(
            http.clone(),
            agentic.clone(),
            PROJECT_PROBE_TIMEOUT,
        ));
        let oauth = Arc::new(OAuthManager::new(
            http.clone(),
            store,
            resolver,
            config.basic.app_scheme.clone(),
        ));

        for provider in config
            .providers
            .iter()
            .filter(|provider| provider.kind == ProviderKind::Agentic)
        {
            oauth.register_client(provider.id.clone(), agentic.oauth_client_settings());
            info!(provider = %provider.id, "Registered Code Assist OAuth client");
        }

        Ok(Self::from_parts(http, oauth, agentic, &config.basic))
    }

    /// Assemble from pre-built parts, e.g. an OAuth manager pointed at a test server.
    pub fn from_parts(
        http: reqwest::Client,
        oauth: Arc<OAuthManager>,
        agentic: Arc<AgenticResolvedConfig>,
        basic: &BasicConfig,
    ) -> Self {
        Self {
            controller: StreamController::new(http.clone(), oauth.clone(), basic.read_timeout()),
            http,
            oauth,
            agentic,
            request_timeout: basic.request_timeout(),
        }
    }

    pub fn oauth(&self) -> &Arc<OAuthManager> {
        &self.oauth
    }

    /// Stream a chat turn, cancelling whatever stream this client had running.
    pub fn stream_chat(&self, req: ChatRequest) -> EventStream {
        self.controller.stream_chat(req)
    }

    pub fn cancel_streaming(&self) {
        self.controller.cancel_streaming();
    }

    pub fn is_streaming(&self) -> bool {
        self.controller.is_streaming()
    }
}
