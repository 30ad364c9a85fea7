use serde::{Deserialize, Serialize};
use url::Url;

use crate::oauth::OAuthClientSettings;

/// Code Assist configuration managed by Figment.
///
/// OAuth endpoints and client credentials are fixed to built-in defaults and are
/// not read from `castor.toml`; tests override them on the resolved config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgenticConfig {
    /// Candidate API endpoints, probed in order during project discovery.
    /// TOML: `agentic.endpoints`.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<Url>,

    /// Project used when discovery fails on every endpoint and no hint is given.
    /// TOML: `agentic.default_project_id`. Default: `rising-fact-p41fc`.
    #[serde(default = "default_project_id")]
    pub default_project_id: String,

    /// Models offered by the agentic provider; it has no listing endpoint.
    /// TOML: `agentic.model_list`.
    #[serde(default = "default_model_list")]
    pub model_list: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AgenticResolvedConfig {
    /// Never empty.
    pub endpoints: Vec<Url>,
    pub default_project_id: String,
    pub model_list: Vec<String>,
    pub oauth_auth_url: Url,
    pub oauth_token_url: Url,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_scopes: Vec<String>,
}

impl AgenticConfig {
    pub fn resolve(&self) -> AgenticResolvedConfig {
        let endpoints = if self.endpoints.is_empty() {
            default_endpoints()
        } else {
            self.endpoints.clone()
        };
        AgenticResolvedConfig {
            endpoints,
            default_project_id: self.default_project_id.clone(),
            model_list: self.model_list.clone(),
            oauth_auth_url: default_oauth_auth_url(),
            oauth_token_url: default_oauth_token_url(),
            oauth_client_id: default_oauth_client_id(),
            oauth_client_secret: default_oauth_client_secret(),
            oauth_scopes: default_oauth_scopes(),
        }
    }
}

impl AgenticResolvedConfig {
    pub fn primary_endpoint(&self) -> &Url {
        &self.endpoints[0]
    }

    /// Google OAuth client registration, requesting offline access with forced consent.
    pub fn oauth_client_settings(&self) -> OAuthClientSettings {
        OAuthClientSettings {
            client_id: self.oauth_client_id.clone(),
            client_secret: Some(self.oauth_client_secret.clone()),
            auth_url: self.oauth_auth_url.clone(),
            token_url: self.oauth_token_url.clone(),
            scopes: self.oauth_scopes.clone(),
            extra_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
        }
    }
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            default_project_id: default_project_id(),
            model_list: default_model_list(),
        }
    }
}

fn default_endpoints() -> Vec<Url> {
    [
        "https://daily-cloudcode-pa.sandbox.googleapis.com",
        "https://daily-cloudcode-pa.googleapis.com",
        "https://cloudcode-pa.googleapis.com",
    ]
    .into_iter()
    .map(|raw| Url::parse(raw).expect("default agentic endpoint must be a valid URL"))
    .collect()
}

fn default_project_id() -> String {
    "rising-fact-p41fc".to_string()
}

fn default_model_list() -> Vec<String> {
    [
        "gemini-3-pro-high",
        "gemini-3-flash",
        "claude-sonnet-4-5",
        "claude-sonnet-4-5-thinking",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_oauth_auth_url() -> Url {
    Url::parse("https://accounts.google.com/o/oauth2/v2/auth")
        .expect("default oauth_auth_url must be a valid URL")
}

fn default_oauth_token_url() -> Url {
    Url::parse("https://oauth2.googleapis.com/token")
        .expect("default oauth_token_url must be a valid URL")
}

fn default_oauth_client_id() -> String {
    "1071006060591-tmhssin2h21lcre235vtolojh4g403ep.apps.googleusercontent.com".to_string()
}

fn default_oauth_client_secret() -> String {
    "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".to_string()
}

fn default_oauth_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/cloud-platform".to_string(),
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
        "https://www.googleapis.com/auth/userinfo.profile".to_string(),
        "https://www.googleapis.com/auth/cclog".to_string(),
        "https://www.googleapis.com/auth/experimentsandconfigs".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_list_falls_back_to_defaults() {
        let cfg = AgenticConfig {
            endpoints: Vec::new(),
            ..AgenticConfig::default()
        };
        let resolved = cfg.resolve();
        assert_eq!(resolved.endpoints.len(), 3);
        assert_eq!(
            resolved.primary_endpoint().as_str(),
            "https://daily-cloudcode-pa.sandbox.googleapis.com/"
        );
    }

    #[test]
    fn client_settings_request_offline_access() {
        let settings = AgenticConfig::default().resolve().oauth_client_settings();
        assert_eq!(
            settings.token_url.as_str(),
            "https://oauth2.googleapis.com/token"
        );
        assert!(
            settings
                .extra_params
                .contains(&("access_type".to_string(), "offline".to_string()))
        );
        assert!(
            settings
                .extra_params
                .contains(&("prompt".to_string(), "consent".to_string()))
        );
    }
}
