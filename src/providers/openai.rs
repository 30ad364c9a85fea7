use castor_schema::openai::{
    OpenaiChatCompletion, OpenaiChatRequest, OpenaiContent, OpenaiContentPart, OpenaiFile,
    OpenaiImageUrl, OpenaiMessage, OpenaiModelList, OpenaiStreamChunk,
};

use super::dialect::{ParsedLine, SseLine, accepted_attachments, classify_sse};
use crate::types::{ChatRequest, ErrorCode, ModelInfo, UnifiedStreamEvent};

pub(crate) fn encode(req: &ChatRequest, stream: bool) -> OpenaiChatRequest {
    let config = req.config.as_ref();
    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if let Some(system) = req.effective_system_prompt() {
        messages.push(OpenaiMessage::text("system", system));
    }

    for message in &req.messages {
        let attachments = accepted_attachments(config, message);
        if attachments.is_empty() {
            messages.push(OpenaiMessage::text(message.role.as_str(), &message.content));
            continue;
        }

        let mut parts = Vec::with_capacity(attachments.len() + 1);
        if !message.content.is_empty() {
            parts.push(OpenaiContentPart::Text {
                text: message.content.clone(),
            });
        }
        parts.extend(attachments.into_iter().map(|attachment| {
            if attachment.is_image() {
                OpenaiContentPart::ImageUrl {
                    image_url: OpenaiImageUrl {
                        url: attachment.data_url(),
                    },
                }
            } else {
                OpenaiContentPart::File {
                    file: OpenaiFile {
                        filename: attachment.file_name.clone(),
                        file_data: attachment.data_url(),
                    },
                }
            }
        }));
        messages.push(OpenaiMessage {
            role: message.role.as_str().to_string(),
            content: OpenaiContent::Parts(parts),
        });
    }

    OpenaiChatRequest {
        model: req.model.clone(),
        messages,
        stream,
        temperature: req.temperature,
        reasoning_effort: req
            .reasoning_effort
            .filter(|_| config.capabilities.reasoning)
            .map(|effort| effort.as_str().to_string()),
    }
}

pub(crate) fn parse_line(line: &str) -> ParsedLine {
    let payload = match classify_sse(line) {
        SseLine::Blank | SseLine::Other => return ParsedLine::Skip,
        SseLine::Comment => return ParsedLine::Events(vec![UnifiedStreamEvent::KeepAlive]),
        SseLine::Data(payload) => payload,
    };
    if payload.is_empty() {
        return ParsedLine::Skip;
    }
    if payload == "[DONE]" {
        return ParsedLine::Events(vec![UnifiedStreamEvent::done(None, None)]);
    }

    let chunk: OpenaiStreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(err) => {
            return ParsedLine::Malformed {
                reason: err.to_string(),
            };
        }
    };

    if let Some(error) = chunk.error {
        let status = error.http_status();
        return ParsedLine::Events(vec![UnifiedStreamEvent::Error {
            message: error
                .message
                .clone()
                .unwrap_or_else(|| "upstream reported an error".to_string()),
            code: status
                .map(ErrorCode::Http)
                .or_else(|| error.code_string().map(ErrorCode::Upstream)),
            recoverable: status.is_some_and(|status| status == 429 || status >= 500),
        }]);
    }

    // Usage-only chunks carry no choices.
    let Some(choice) = chunk.choices.into_iter().next() else {
        return ParsedLine::Skip;
    };

    let mut events = Vec::new();
    if let Some(delta) = &choice.delta {
        if let Some(reasoning) = delta.reasoning_text().filter(|text| !text.is_empty()) {
            events.push(UnifiedStreamEvent::thought(reasoning));
        }
        if let Some(content) = delta.content.as_deref().filter(|text| !text.is_empty()) {
            events.push(UnifiedStreamEvent::answer(content));
        }
    }
    if let Some(reason) = choice.finish_reason {
        events.push(UnifiedStreamEvent::done(Some(reason), chunk.model));
    }
    ParsedLine::from_events(events)
}

pub(crate) fn completion_text(body: &[u8]) -> Result<Option<String>, serde_json::Error> {
    let completion: OpenaiChatCompletion = serde_json::from_slice(body)?;
    Ok(completion.answer_text().map(str::to_string))
}

pub(crate) fn model_list(body: &[u8], provider_id: &str) -> Result<Vec<ModelInfo>, serde_json::Error> {
    let list: OpenaiModelList = serde_json::from_slice(body)?;
    Ok(list
        .data
        .iter()
        .map(|model| ModelInfo {
            id: model.id.clone(),
            name: model.label().to_string(),
            provider_id: provider_id.to_string(),
        })
        .collect())
}
