use serde::{Deserialize, Serialize};

/// `GET /v1/models` response.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OpenaiModelList {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub data: Vec<OpenaiModel>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OpenaiModel {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
    /// Anthropic and some gateways expose a human label.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl OpenaiModel {
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(&self.id)
    }
}
