use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Backend family; decides the wire dialect and URL layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai_compatible", alias = "openai")]
    OpenAiCompatible,
    Ollama,
    Anthropic,
    Gemini,
    /// OAuth-gated Code Assist backend.
    Agentic,
    Copilot,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAiCompatible => "openai_compatible",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Agentic => "agentic",
            ProviderKind::Copilot => "copilot",
        }
    }

    /// Authentication a freshly configured provider of this kind uses.
    pub fn default_auth(self) -> AuthKind {
        match self {
            ProviderKind::Ollama => AuthKind::None,
            ProviderKind::Agentic => AuthKind::OAuth,
            _ => AuthKind::ApiKey,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    ApiKey,
    #[serde(rename = "oauth")]
    OAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub streaming: bool,
    pub images: bool,
    pub pdf: bool,
    pub reasoning: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            streaming: true,
            images: false,
            pdf: false,
            reasoning: false,
        }
    }
}

/// One configured backend. Read-only once loaded; shared as `Arc<ProviderConfig>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub auth: AuthKind,
    pub base_url: Url,
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Extra headers applied after the dialect's own headers.
    #[serde(default)]
    pub custom_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, kind: ProviderKind, base_url: Url) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            auth: kind.default_auth(),
            base_url,
            default_model: String::new(),
            system_prompt: None,
            custom_headers: BTreeMap::new(),
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }
}
