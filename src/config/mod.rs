mod agentic;
mod basic;

pub use agentic::{AgenticConfig, AgenticResolvedConfig};
pub use basic::BasicConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CastorError;
use crate::types::ProviderConfig;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Runtime settings (see `basic` table in castor.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Code Assist discovery and model settings (see `agentic` table in castor.toml).
    #[serde(default)]
    pub agentic: AgenticConfig,

    /// Configured backends (`[[providers]]` entries in castor.toml).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

pub const DEFAULT_CONFIG_FILE: &str = "castor.toml";

impl Config {
    /// Builds a Figment that merges defaults and `path` when that file exists.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.as_ref().is_file() {
            figment.merge(Toml::file(path.as_ref()))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `castor.toml` if present.
    pub fn load() -> Result<Self, CastorError> {
        Self::from_figment(Self::figment(PathBuf::from(DEFAULT_CONFIG_FILE)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, CastorError> {
        let cfg: Self = figment
            .extract()
            .map_err(|err| CastorError::Config(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), CastorError> {
        if self.basic.app_scheme.trim().is_empty() {
            return Err(CastorError::Config(
                "basic.app_scheme must be set and non-empty".to_string(),
            ));
        }
        let mut seen = ahash::AHashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(CastorError::Config(
                    "providers[].id must be non-empty".to_string(),
                ));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(CastorError::Config(format!(
                    "duplicate provider id: {}",
                    provider.id
                )));
            }
        }
        Ok(())
    }

    pub fn agentic(&self) -> AgenticResolvedConfig {
        self.agentic.resolve()
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|provider| provider.id == id)
    }
}
