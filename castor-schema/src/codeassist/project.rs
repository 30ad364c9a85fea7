//! Project discovery bodies for `loadCodeAssist` and `onboardUser`.

use serde::{Deserialize, Serialize};

/// Client identification sent with every discovery call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub ide_type: String,
    pub platform: String,
    pub plugin_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duet_project: Option<String>,
}

impl Default for ClientMetadata {
    fn default() -> Self {
        Self {
            ide_type: "ANTIGRAVITY".to_string(),
            platform: "PLATFORM_UNSPECIFIED".to_string(),
            plugin_type: "GEMINI".to_string(),
            duet_project: None,
        }
    }
}

impl ClientMetadata {
    /// Default metadata, naming `hint` as the preferred project when non-blank.
    pub fn with_project_hint(hint: Option<&str>) -> Self {
        Self {
            duet_project: hint
                .map(str::trim)
                .filter(|hint| !hint.is_empty())
                .map(str::to_string),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCodeAssistRequest {
    pub metadata: ClientMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardUserRequest {
    pub tier_id: String,
    pub metadata: ClientMetadata,
}

/// Typed view of the `loadCodeAssist` response.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadCodeAssistResponse {
    #[serde(default, rename = "cloudaicompanionProject")]
    pub project: Option<ProjectIdOrObject>,
    #[serde(default)]
    pub allowed_tiers: Vec<AllowedTier>,
}

impl LoadCodeAssistResponse {
    pub fn project_id(&self) -> Option<String> {
        self.project.clone().and_then(ProjectIdOrObject::into_id)
    }

    /// Id of the tier flagged `isDefault`, if any.
    pub fn default_tier(&self) -> Option<&str> {
        self.allowed_tiers
            .iter()
            .find(|tier| tier.is_default)
            .and_then(|tier| tier.id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTier {
    pub id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Long-running operation returned by `onboardUser`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardUserOperation {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<OnboardUserResponse>,
}

impl OnboardUserOperation {
    /// Project id of a finished operation.
    pub fn project_id(self) -> Option<String> {
        if !self.done {
            return None;
        }
        self.response
            .and_then(|response| response.project)
            .and_then(ProjectIdOrObject::into_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardUserResponse {
    #[serde(rename = "cloudaicompanionProject")]
    pub project: Option<ProjectIdOrObject>,
}

/// `cloudaicompanionProject` is sent either as a bare id or as `{"id": ...}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ProjectIdOrObject {
    String(String),
    Object { id: String },
}

impl ProjectIdOrObject {
    pub fn into_id(self) -> Option<String> {
        match self {
            ProjectIdOrObject::String(s) if !s.trim().is_empty() => Some(s),
            ProjectIdOrObject::Object { id } if !id.trim().is_empty() => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_request_serializes_metadata_without_hint() {
        let body = LoadCodeAssistRequest {
            metadata: ClientMetadata::with_project_hint(None),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"metadata": {
                "ideType": "ANTIGRAVITY",
                "platform": "PLATFORM_UNSPECIFIED",
                "pluginType": "GEMINI"
            }})
        );
    }

    #[test]
    fn hint_is_sent_as_duet_project() {
        let meta = ClientMetadata::with_project_hint(Some(" my-proj "));
        assert_eq!(meta.duet_project.as_deref(), Some("my-proj"));
        assert!(ClientMetadata::with_project_hint(Some("  ")).duet_project.is_none());
    }

    #[test]
    fn project_accepts_string_or_object() {
        let as_string: LoadCodeAssistResponse =
            serde_json::from_value(json!({"cloudaicompanionProject": "p-1"})).unwrap();
        let as_object: LoadCodeAssistResponse =
            serde_json::from_value(json!({"cloudaicompanionProject": {"id": "p-2"}})).unwrap();
        let blank: LoadCodeAssistResponse =
            serde_json::from_value(json!({"cloudaicompanionProject": ""})).unwrap();

        assert_eq!(as_string.project_id().as_deref(), Some("p-1"));
        assert_eq!(as_object.project_id().as_deref(), Some("p-2"));
        assert!(blank.project_id().is_none());
    }

    #[test]
    fn default_tier_is_selected() {
        let resp: LoadCodeAssistResponse = serde_json::from_value(json!({
            "allowedTiers": [
                {"id": "free-tier", "isDefault": false},
                {"id": "standard-tier", "isDefault": true}
            ]
        }))
        .unwrap();
        assert_eq!(resp.default_tier(), Some("standard-tier"));
        assert!(LoadCodeAssistResponse::default().default_tier().is_none());
    }

    #[test]
    fn onboard_operation_requires_done() {
        let pending: OnboardUserOperation = serde_json::from_value(json!({"done": false})).unwrap();
        let done: OnboardUserOperation = serde_json::from_value(json!({
            "done": true,
            "response": {"cloudaicompanionProject": {"id": "onboarded"}}
        }))
        .unwrap();

        assert!(pending.project_id().is_none());
        assert_eq!(done.project_id().as_deref(), Some("onboarded"));
    }
}
