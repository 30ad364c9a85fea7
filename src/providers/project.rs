use std::sync::Arc;
use std::time::Duration;

use castor_schema::codeassist::{
    ClientMetadata, LoadCodeAssistRequest, LoadCodeAssistResponse, OnboardUserOperation,
    OnboardUserRequest,
};
use moka::sync::Cache;
use reqwest::header::HeaderMap;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};
use url::Url;

use super::headers;
use super::provider_endpoints::build_provider_url;
use crate::config::AgenticResolvedConfig;
use crate::error::OauthError;
use crate::types::ProjectInfo;

const PROJECT_CACHE_CAPACITY: u64 = 256;

/// Discovers which Code Assist endpoint serves an account and under which
/// project, remembering the answer per provider until invalidated.
pub struct ProjectResolver {
    http: reqwest::Client,
    cfg: Arc<AgenticResolvedConfig>,
    probe_timeout: Duration,
    cache: Cache<String, ProjectInfo>,
}

impl ProjectResolver {
    pub fn new(
        http: reqwest::Client,
        cfg: Arc<AgenticResolvedConfig>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            http,
            cfg,
            probe_timeout,
            cache: Cache::builder().max_capacity(PROJECT_CACHE_CAPACITY).build(),
        }
    }

    pub fn cached(&self, provider_id: &str) -> Option<ProjectInfo> {
        self.cache.get(provider_id)
    }

    pub fn invalidate(&self, provider_id: &str) {
        self.cache.invalidate(provider_id);
        debug!(provider = %provider_id, "[Project] cache cleared");
    }

    /// Endpoint and project for `provider_id`. Never fails: when no candidate
    /// answers, the hint (or the configured default) is returned uncached.
    pub async fn resolve(
        &self,
        provider_id: &str,
        access_token: &str,
        hint: Option<&str>,
    ) -> ProjectInfo {
        if let Some(info) = self.cache.get(provider_id) {
            return info;
        }

        let mut last_tried = None;
        for endpoint in &self.cfg.endpoints {
            last_tried = Some(endpoint);
            match self.probe(endpoint, access_token, hint).await {
                Ok(Some(project_id)) => {
                    info!(
                        provider = %provider_id,
                        endpoint = %endpoint,
                        project = %project_id,
                        "[Project] discovered"
                    );
                    let info = ProjectInfo {
                        endpoint: endpoint.clone(),
                        project_id,
                        fallback: false,
                    };
                    self.cache.insert(provider_id.to_string(), info.clone());
                    return info;
                }
                Ok(None) => {
                    debug!(provider = %provider_id, endpoint = %endpoint, "[Project] endpoint has no project");
                }
                Err(err) => {
                    warn!(provider = %provider_id, endpoint = %endpoint, error = %err, "[Project] probe failed");
                }
            }
        }

        let project_id = hint
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map_or_else(|| self.cfg.default_project_id.clone(), str::to_string);
        let endpoint = last_tried
            .unwrap_or_else(|| self.cfg.primary_endpoint())
            .clone();
        warn!(
            provider = %provider_id,
            endpoint = %endpoint,
            project = %project_id,
            "[Project] discovery failed on every endpoint, using fallback"
        );
        ProjectInfo {
            endpoint,
            project_id,
            fallback: true,
        }
    }

    /// `loadCodeAssist`, then a single `onboardUser` when the account has no
    /// project yet but is offered a default tier.
    async fn probe(
        &self,
        endpoint: &Url,
        access_token: &str,
        hint: Option<&str>,
    ) -> Result<Option<String>, OauthError> {
        let metadata = ClientMetadata::with_project_hint(hint);
        let loaded: LoadCodeAssistResponse = self
            .post(
                endpoint,
                "/v1internal:loadCodeAssist",
                access_token,
                &LoadCodeAssistRequest {
                    metadata: metadata.clone(),
                },
            )
            .await?;

        if let Some(project_id) = loaded.project_id() {
            return Ok(Some(project_id));
        }
        let Some(tier_id) = loaded.default_tier() else {
            return Ok(None);
        };

        info!(endpoint = %endpoint, tier = %tier_id, "[Project] onboarding account");
        let operation: OnboardUserOperation = self
            .post(
                endpoint,
                "/v1internal:onboardUser",
                access_token,
                &OnboardUserRequest {
                    tier_id: tier_id.to_string(),
                    metadata,
                },
            )
            .await?;
        Ok(operation.project_id())
    }

    async fn post<B, R>(
        &self,
        endpoint: &Url,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<R, OauthError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers::code_assist_bundle(&mut headers);

        let resp = self
            .http
            .post(build_provider_url(endpoint, path, None))
            .headers(headers)
            .bearer_auth(access_token)
            .timeout(self.probe_timeout)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OauthError::UpstreamStatus(resp.status()));
        }
        Ok(resp.json::<R>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgenticConfig;

    fn resolver(endpoints: Vec<Url>) -> ProjectResolver {
        let mut cfg = AgenticConfig::default().resolve();
        cfg.endpoints = endpoints;
        ProjectResolver::new(
            reqwest::Client::new(),
            Arc::new(cfg),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn unreachable_endpoints_fall_back_to_hint() {
        let endpoints = vec![
            Url::parse("http://127.0.0.1:1").unwrap(),
            Url::parse("http://127.0.0.1:2").unwrap(),
        ];
        let resolver = resolver(endpoints.clone());

        let info = resolver.resolve("agentic", "token", Some("my-proj")).await;
        assert!(info.fallback);
        assert_eq!(info.project_id, "my-proj");
        assert_eq!(info.endpoint, endpoints[1]);
        assert!(resolver.cached("agentic").is_none());

        let info = resolver.resolve("agentic", "token", None).await;
        assert_eq!(info.project_id, "rising-fact-p41fc");
    }

    #[test]
    fn invalidate_drops_cached_entry() {
        let resolver = resolver(vec![Url::parse("http://127.0.0.1:1").unwrap()]);
        resolver.cache.insert(
            "agentic".to_string(),
            ProjectInfo {
                endpoint: Url::parse("https://cloudcode-pa.googleapis.com").unwrap(),
                project_id: "p".to_string(),
                fallback: false,
            },
        );
        assert!(resolver.cached("agentic").is_some());
        resolver.invalidate("agentic");
        assert!(resolver.cached("agentic").is_none());
    }
}
