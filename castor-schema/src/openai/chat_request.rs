//! Chat Completions request body (`POST /v1/chat/completions`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenaiChatRequest {
    pub model: String,
    pub messages: Vec<OpenaiMessage>,
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// `low` / `medium` / `high`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenaiMessage {
    pub role: String,
    pub content: OpenaiContent,
}

impl OpenaiMessage {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: OpenaiContent::Text(text.into()),
        }
    }
}

/// Plain string content, or a multimodal part array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OpenaiContent {
    Text(String),
    Parts(Vec<OpenaiContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenaiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenaiImageUrl },
    File { file: OpenaiFile },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenaiImageUrl {
    /// `data:<mime>;base64,<payload>` or a remote URL.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenaiFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub file_data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_only_request_shape() {
        let req = OpenaiChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![
                OpenaiMessage::text("system", "be brief"),
                OpenaiMessage::text("user", "hi"),
            ],
            stream: true,
            temperature: Some(0.5),
            reasoning_effort: None,
        };

        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "stream": true,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn multimodal_parts_are_tagged_by_type() {
        let message = OpenaiMessage {
            role: "user".to_string(),
            content: OpenaiContent::Parts(vec![
                OpenaiContentPart::Text {
                    text: "look".to_string(),
                },
                OpenaiContentPart::ImageUrl {
                    image_url: OpenaiImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                    },
                },
                OpenaiContentPart::File {
                    file: OpenaiFile {
                        filename: Some("doc.pdf".to_string()),
                        file_data: "data:application/pdf;base64,BBBB".to_string(),
                    },
                },
            ]),
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "look"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                    {"type": "file", "file": {
                        "filename": "doc.pdf",
                        "file_data": "data:application/pdf;base64,BBBB"
                    }}
                ]
            })
        );
    }
}
