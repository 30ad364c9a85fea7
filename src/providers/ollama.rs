use castor_schema::ollama::{
    OllamaChatRequest, OllamaMessage, OllamaOptions, OllamaStreamChunk, OllamaTags,
};

use tracing::warn;

use super::dialect::{ParsedLine, accepted_attachments};
use crate::types::{ChatRequest, ModelInfo, UnifiedStreamEvent};

pub(crate) fn encode(req: &ChatRequest, stream: bool) -> OllamaChatRequest {
    let config = req.config.as_ref();
    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if let Some(system) = req.effective_system_prompt() {
        messages.push(OllamaMessage {
            role: "system".to_string(),
            content: system.to_string(),
            ..Default::default()
        });
    }

    for message in &req.messages {
        // Ollama only takes raw base64 images.
        let images: Vec<String> = accepted_attachments(config, message)
            .into_iter()
            .filter(|attachment| {
                if !attachment.is_image() {
                    warn!(provider = %config.id, mime = %attachment.mime_type, "Ollama accepts only image attachments");
                }
                attachment.is_image()
            })
            .map(|attachment| attachment.data.clone())
            .collect();
        messages.push(OllamaMessage {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            images: (!images.is_empty()).then_some(images),
            thinking: None,
        });
    }

    OllamaChatRequest {
        model: req.model.clone(),
        messages,
        stream,
        options: req.temperature.map(|temperature| OllamaOptions {
            temperature: Some(temperature),
        }),
        think: req
            .reasoning_effort
            .filter(|_| config.capabilities.reasoning)
            .map(|_| true),
    }
}

pub(crate) fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Skip;
    }

    let chunk: OllamaStreamChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(err) => {
            return ParsedLine::Malformed {
                reason: err.to_string(),
            };
        }
    };

    if let Some(error) = chunk.error {
        return ParsedLine::Events(vec![UnifiedStreamEvent::Error {
            message: error,
            code: None,
            recoverable: false,
        }]);
    }

    let mut events = Vec::new();
    if let Some(message) = &chunk.message {
        if let Some(thinking) = message.thinking.as_deref().filter(|text| !text.is_empty()) {
            events.push(UnifiedStreamEvent::thought(thinking));
        }
        if !message.content.is_empty() {
            events.push(UnifiedStreamEvent::answer(message.content.as_str()));
        }
    }
    if chunk.done {
        events.push(UnifiedStreamEvent::done(chunk.done_reason, chunk.model));
    }
    ParsedLine::from_events(events)
}

pub(crate) fn completion_text(body: &[u8]) -> Result<Option<String>, serde_json::Error> {
    let chunk: OllamaStreamChunk = serde_json::from_slice(body)?;
    Ok(chunk
        .message
        .map(|message| message.content)
        .filter(|text| !text.is_empty()))
}

pub(crate) fn model_list(body: &[u8], provider_id: &str) -> Result<Vec<ModelInfo>, serde_json::Error> {
    let tags: OllamaTags = serde_json::from_slice(body)?;
    Ok(tags
        .models
        .iter()
        .map(|model| ModelInfo {
            id: model.id().to_string(),
            name: model.name.clone(),
            provider_id: provider_id.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Attachment, Capabilities, ConversationMessage, ProviderConfig, ProviderKind,
        ReasoningEffort,
    };
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    #[test]
    fn scenario_content_then_done() {
        assert_eq!(
            parse_line(r#"{"message":{"content":"Hi"},"done":false}"#),
            ParsedLine::Events(vec![UnifiedStreamEvent::answer("Hi")])
        );
        assert_eq!(
            parse_line(r#"{"done":true}"#),
            ParsedLine::Events(vec![UnifiedStreamEvent::done(None, None)])
        );
    }

    #[test]
    fn final_line_carries_reason_and_model() {
        assert_eq!(
            parse_line(
                r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#
            ),
            ParsedLine::Events(vec![UnifiedStreamEvent::done(
                Some("stop".into()),
                Some("llama3".into())
            )])
        );
    }

    #[test]
    fn thinking_is_thought_content() {
        assert_eq!(
            parse_line(r#"{"message":{"role":"assistant","content":"","thinking":"let me see"},"done":false}"#),
            ParsedLine::Events(vec![UnifiedStreamEvent::thought("let me see")])
        );
    }

    #[test]
    fn errors_and_garbage() {
        assert_eq!(
            parse_line(r#"{"error":"model 'x' not found"}"#),
            ParsedLine::Events(vec![UnifiedStreamEvent::Error {
                message: "model 'x' not found".into(),
                code: None,
                recoverable: false,
            }])
        );
        assert!(matches!(parse_line("{not json"), ParsedLine::Malformed { .. }));
        assert_eq!(parse_line("   "), ParsedLine::Skip);
    }

    #[test]
    fn encode_passes_raw_images_and_think() {
        let config = ProviderConfig::new(
            "local",
            ProviderKind::Ollama,
            Url::parse("http://127.0.0.1:11434").unwrap(),
        )
        .with_capabilities(Capabilities {
            images: true,
            pdf: true,
            reasoning: true,
            ..Capabilities::default()
        });
        let req = ChatRequest::new(
            Arc::new(config),
            vec![
                ConversationMessage::user("see")
                    .with_attachment(Attachment {
                        mime_type: "image/jpeg".into(),
                        data: "anBn".into(),
                        file_name: None,
                    })
                    .with_attachment(Attachment {
                        mime_type: "application/pdf".into(),
                        data: "cGRm".into(),
                        file_name: None,
                    }),
            ],
        )
        .with_model("llava")
        .with_system_prompt("sys")
        .with_temperature(0.25)
        .with_reasoning_effort(ReasoningEffort::Medium);

        assert_eq!(
            serde_json::to_value(encode(&req, true)).unwrap(),
            json!({
                "model": "llava",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "see", "images": ["anBn"]}
                ],
                "stream": true,
                "options": {"temperature": 0.25},
                "think": true
            })
        );
    }

    #[test]
    fn tags_become_models() {
        let models = model_list(
            br#"{"models":[{"name":"qwen3:8b"},{"name":"llama3:latest","model":"llama3:latest"}]}"#,
            "local",
        )
        .unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "qwen3:8b");
    }

    #[test]
    fn non_streaming_body_yields_text() {
        assert_eq!(
            completion_text(br#"{"message":{"role":"assistant","content":"ok"},"done":true}"#)
                .unwrap()
                .as_deref(),
            Some("ok")
        );
    }
}
