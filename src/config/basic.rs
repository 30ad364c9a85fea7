use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::CastorError;

/// User agent sent by the shared HTTP client.
pub const CASTOR_USER_AGENT: &str = concat!("castor/", env!("CARGO_PKG_VERSION"));

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Deep-link scheme OAuth redirects come back on: `<app_scheme>://oauth/<provider_id>`.
    /// TOML: `basic.app_scheme`. Default: `castor`.
    #[serde(default = "default_app_scheme")]
    pub app_scheme: String,

    /// TCP/TLS connect timeout.
    /// TOML: `basic.connect_timeout_secs`. Default: `30`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum silence between two streamed lines.
    /// TOML: `basic.read_timeout_secs`. Default: `300`.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Whole-request timeout for non-streaming calls.
    /// TOML: `basic.write_timeout_secs`. Default: `30`.
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Optional upstream HTTP proxy. Example: `http://127.0.0.1:1080`.
    /// TOML: `basic.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
            app_scheme: default_app_scheme(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            proxy: None,
        }
    }
}

impl BasicConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Build the shared client: no redirects, connect/read timeouts, optional proxy.
    ///
    /// No whole-request timeout is set here since streams may run for minutes;
    /// non-streaming calls apply [`Self::request_timeout`] per request.
    pub fn build_http_client(&self) -> Result<reqwest::Client, CastorError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(CASTOR_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(self.connect_timeout())
            .read_timeout(self.read_timeout());

        if let Some(proxy_url) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
                .map_err(|err| CastorError::Config(format!("invalid proxy url: {err}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|err| CastorError::Config(format!("failed to build HTTP client: {err}")))
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_app_scheme() -> String {
    "castor".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_read_timeout_secs() -> u64 {
    300
}

fn default_write_timeout_secs() -> u64 {
    30
}
