use serde::{Deserialize, Serialize};

/// `GET /v1beta/models` response.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelList {
    #[serde(default)]
    pub models: Vec<GeminiModel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModel {
    /// Resource name, e.g. `models/gemini-2.5-pro`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_token_limit: Option<u64>,
    #[serde(default)]
    pub output_token_limit: Option<u64>,
    #[serde(default)]
    pub supported_generation_methods: Option<Vec<String>>,
    #[serde(default)]
    pub thinking: Option<bool>,
}

impl GeminiModel {
    /// Model id without the `models/` resource prefix.
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    /// Display name, falling back to the bare id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_prefix_is_stripped() {
        let list: GeminiModelList = serde_json::from_value(json!({
            "models": [
                {"name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash"},
                {"name": "gemini-raw"}
            ]
        }))
        .unwrap();

        assert_eq!(list.models[0].id(), "gemini-2.5-flash");
        assert_eq!(list.models[0].label(), "Gemini 2.5 Flash");
        assert_eq!(list.models[1].id(), "gemini-raw");
        assert_eq!(list.models[1].label(), "gemini-raw");
    }

    #[test]
    fn empty_body_is_an_empty_list() {
        let list: GeminiModelList = serde_json::from_value(json!({})).unwrap();
        assert!(list.models.is_empty());
    }
}
