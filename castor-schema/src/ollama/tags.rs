use serde::Deserialize;

/// `GET /api/tags` response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OllamaTags {
    #[serde(default)]
    pub models: Vec<OllamaModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    /// Usually equal to `name`; older servers omit it.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl OllamaModel {
    pub fn id(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_parse_with_and_without_model_field() {
        let tags: OllamaTags = serde_json::from_value(json!({
            "models": [
                {"name": "llama3:latest", "model": "llama3:latest", "size": 4661224676u64},
                {"name": "qwen3:8b"}
            ]
        }))
        .unwrap();

        assert_eq!(tags.models[0].id(), "llama3:latest");
        assert_eq!(tags.models[1].id(), "qwen3:8b");
    }
}
