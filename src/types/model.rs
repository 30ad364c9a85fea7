use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider_id: String,
}

/// Resolved Code Assist endpoint and billing project for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub endpoint: Url,
    pub project_id: String,
    /// Discovery failed everywhere and this is the configured fallback.
    pub fallback: bool,
}
