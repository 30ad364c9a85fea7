use castor_schema::codeassist::{CodeAssistRequestBody, CodeAssistRequestMeta, CodeAssistResponseBody};
use castor_schema::gemini::{
    Content, GeminiErrorBody, GeminiGenerateContentRequest, GeminiModelList, GeminiResponseBody,
    Part, ThinkingConfig,
};
use chrono::Utc;
use rand::Rng as _;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use super::dialect::{ParsedLine, SseLine, accepted_attachments, classify_sse};
use super::provider_endpoints::ProviderEndpoints;
use crate::types::{ChatRequest, ContentKind, ErrorCode, ModelInfo, Role, UnifiedStreamEvent};

const REQUEST_ID_PREFIX: &str = "agent";
const SESSION_ID_MAX_EXCLUSIVE: i64 = 9_000_000_000_000_000_000;
const CLAUDE_THINKING_BUDGET: u32 = 8096;

pub(crate) fn code_assist_endpoints(base: &Url) -> ProviderEndpoints {
    ProviderEndpoints::new(
        base,
        "/v1internal:streamGenerateContent",
        Some("alt=sse"),
        "/v1internal:generateContent",
        None,
    )
}

pub(crate) fn encode(req: &ChatRequest) -> GeminiGenerateContentRequest {
    let config = req.config.as_ref();
    let mut system_texts: Vec<&str> = req.effective_system_prompt().into_iter().collect();
    let mut contents = Vec::with_capacity(req.messages.len());

    for message in &req.messages {
        if message.role == Role::System {
            if !message.content.trim().is_empty() {
                system_texts.push(&message.content);
            }
            continue;
        }

        let mut parts = Vec::with_capacity(message.attachments.len() + 1);
        if !message.content.is_empty() {
            parts.push(Part::text(message.content.as_str()));
        }
        parts.extend(
            accepted_attachments(config, message)
                .into_iter()
                .map(|attachment| Part::inline(&attachment.mime_type, &attachment.data)),
        );
        if parts.is_empty() {
            continue;
        }

        contents.push(match message.role {
            Role::Assistant => Content::model(parts),
            _ => Content::user(parts),
        });
    }

    let mut request = GeminiGenerateContentRequest::new(contents);
    request.set_system_text(&system_texts.join("\n\n"));

    if let Some(temperature) = req.temperature {
        request
            .generation_config_mut()
            .set_temperature(f64::from(temperature));
    }
    if let Some(effort) = req.reasoning_effort
        && config.capabilities.reasoning
    {
        request.generation_config_mut().thinking_config = Some(ThinkingConfig {
            include_thoughts: true,
            thinking_budget: Some(effort.thinking_budget()),
        });
    }
    request
}

/// Gemini body wrapped in the Code Assist envelope for `project_id`.
pub(crate) fn encode_code_assist(req: &ChatRequest, project_id: String) -> CodeAssistRequestBody {
    let mut request = encode(req);
    apply_claude_thinking_defaults(&req.model, &mut request);

    CodeAssistRequestMeta {
        project: project_id,
        request_id: generate_request_id(),
        model: req.model.clone(),
        session_id: Some(generate_session_id()),
    }
    .into_request(request)
}

fn request_id_from_parts(timestamp_ms: i64, request_uuid: Uuid) -> String {
    format!("{REQUEST_ID_PREFIX}/{timestamp_ms}/{request_uuid}")
}

fn generate_request_id() -> String {
    request_id_from_parts(Utc::now().timestamp_millis(), Uuid::new_v4())
}

fn session_id_from_int(value: i64) -> String {
    format!("-{value}")
}

fn generate_session_id() -> String {
    session_id_from_int(rand::rng().random_range(0..SESSION_ID_MAX_EXCLUSIVE))
}

fn apply_claude_thinking_defaults(model: &str, request: &mut GeminiGenerateContentRequest) {
    if !model.starts_with("claude") {
        return;
    }
    request
        .generation_config_mut()
        .thinking_config
        .get_or_insert(ThinkingConfig {
            include_thoughts: true,
            thinking_budget: Some(CLAUDE_THINKING_BUDGET),
        });
}

/// A `data:` payload is an error, a Code Assist envelope or a bare response.
#[derive(Deserialize)]
#[serde(untagged)]
enum StreamPayload {
    Error(GeminiErrorBody),
    Envelope(CodeAssistResponseBody),
    Bare(GeminiResponseBody),
}

impl StreamPayload {
    fn parse(payload: &[u8]) -> Result<Result<GeminiResponseBody, GeminiErrorBody>, serde_json::Error> {
        Ok(match serde_json::from_slice(payload)? {
            StreamPayload::Error(error) => Err(error),
            StreamPayload::Envelope(envelope) => Ok(envelope.into()),
            StreamPayload::Bare(body) => Ok(body),
        })
    }
}

fn error_event(body: GeminiErrorBody) -> UnifiedStreamEvent {
    let error = body.error;
    UnifiedStreamEvent::Error {
        recoverable: error.is_transient(),
        code: error
            .code
            .map(ErrorCode::Http)
            .or_else(|| error.status.clone().map(ErrorCode::Upstream)),
        message: error
            .message
            .unwrap_or_else(|| "upstream reported an error".to_string()),
    }
}

/// Content events of the first candidate; adjacent parts of one kind are merged.
fn content_events(body: &GeminiResponseBody) -> Vec<UnifiedStreamEvent> {
    let mut runs: Vec<(ContentKind, String)> = Vec::new();
    let parts = body
        .first_candidate()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();

    for part in parts {
        let Some(text) = part.text.as_deref().filter(|text| !text.is_empty()) else {
            continue;
        };
        let kind = if part.is_thought() {
            ContentKind::Thought
        } else {
            ContentKind::Answer
        };
        match runs.last_mut() {
            Some((last, buffer)) if *last == kind => buffer.push_str(text),
            _ => runs.push((kind, text.to_string())),
        }
    }

    runs.into_iter()
        .map(|(kind, text)| match kind {
            ContentKind::Answer => UnifiedStreamEvent::answer(text),
            ContentKind::Thought => UnifiedStreamEvent::thought(text),
        })
        .collect()
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

    let body = match StreamPayload::parse(payload.as_bytes()) {
        Ok(Ok(body)) => body,
        Ok(Err(error)) => return ParsedLine::Events(vec![error_event(error)]),
        Err(err) => {
            return ParsedLine::Malformed {
                reason: err.to_string(),
            };
        }
    };

    let mut events = content_events(&body);
    if let Some(reason) = body
        .first_candidate()
        .and_then(|candidate| candidate.finish_reason.clone())
    {
        events.push(UnifiedStreamEvent::done(Some(reason), body.modelVersion.clone()));
    }
    ParsedLine::from_events(events)
}

pub(crate) fn completion_text(body: &[u8]) -> Result<Option<String>, serde_json::Error> {
    Ok(match StreamPayload::parse(body)? {
        Ok(body) => body.answer_text(),
        Err(_) => None,
    })
}

/// Models able to `generateContent`; embedding-only entries are left out.
pub(crate) fn model_list(body: &[u8], provider_id: &str) -> Result<Vec<ModelInfo>, serde_json::Error> {
    let list: GeminiModelList = serde_json::from_slice(body)?;
    Ok(list
        .models
        .iter()
        .filter(|model| {
            model
                .supported_generation_methods
                .as_ref()
                .is_none_or(|methods| methods.iter().any(|method| method == "generateContent"))
        })
        .map(|model| ModelInfo {
            id: model.id().to_string(),
            name: model.label().to_string(),
            provider_id: provider_id.to_string(),
        })
        .collect())
}
