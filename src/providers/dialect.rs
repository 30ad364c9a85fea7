//! Single dispatch point from [`ProviderKind`] to wire format.
//!
//! Everything that differs between providers (URLs, auth headers, request
//! bodies, line parsing, model listings) is selected here; callers only see
//! [`PreparedRequest`], [`ParsedLine`] and [`ModelInfo`].

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::provider_endpoints::ProviderEndpoints;
use super::{gemini, headers, ollama, openai};
use crate::error::CastorError;
use crate::types::{
    Attachment, ChatRequest, ConversationMessage, ModelInfo, ProjectInfo, ProviderConfig,
    ProviderKind, UnifiedStreamEvent,
};

/// Outcome of feeding one line of a response body to a dialect parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Blank, comment-free framing or a chunk with nothing to report.
    Skip,
    /// Events in the order they appear on the line; content precedes a terminal event.
    Events(Vec<UnifiedStreamEvent>),
    /// A payload line that could not be decoded.
    Malformed { reason: String },
}

impl ParsedLine {
    pub(crate) fn from_events(events: Vec<UnifiedStreamEvent>) -> Self {
        if events.is_empty() {
            ParsedLine::Skip
        } else {
            ParsedLine::Events(events)
        }
    }
}

/// Wire family a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Chat Completions over SSE.
    OpenAi,
    /// Native Ollama NDJSON.
    Ollama,
    /// `generateContent` over SSE, public or Code Assist.
    Gemini,
}

impl Dialect {
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAiCompatible | ProviderKind::Anthropic | ProviderKind::Copilot => {
                Dialect::OpenAi
            }
            ProviderKind::Ollama => Dialect::Ollama,
            ProviderKind::Gemini | ProviderKind::Agentic => Dialect::Gemini,
        }
    }

    pub fn parse_line(self, line: &str) -> ParsedLine {
        match self {
            Dialect::OpenAi => openai::parse_line(line),
            Dialect::Ollama => ollama::parse_line(line),
            Dialect::Gemini => gemini::parse_line(line),
        }
    }

    /// Whether a stream that closes after content but without a terminator
    /// is reported as finished instead of failed.
    pub fn implicit_done(self) -> bool {
        match self {
            Dialect::OpenAi | Dialect::Ollama | Dialect::Gemini => true,
        }
    }

    /// Answer text of a non-streaming response body.
    pub(crate) fn completion_text(self, body: &[u8]) -> Result<String, CastorError> {
        let text = match self {
            Dialect::OpenAi => openai::completion_text(body)?,
            Dialect::Ollama => ollama::completion_text(body)?,
            Dialect::Gemini => gemini::completion_text(body)?,
        };
        text.ok_or_else(|| CastorError::ParseFailure("response carried no answer text".into()))
    }

    pub(crate) fn model_list(
        self,
        body: &[u8],
        provider_id: &str,
    ) -> Result<Vec<ModelInfo>, serde_json::Error> {
        match self {
            Dialect::OpenAi => openai::model_list(body, provider_id),
            Dialect::Ollama => ollama::model_list(body, provider_id),
            Dialect::Gemini => gemini::model_list(body, provider_id),
        }
    }
}

/// Credential material already resolved for one call.
#[derive(Clone)]
pub(crate) enum Access {
    None,
    ApiKey(String),
    OAuth {
        access_token: String,
        project: Option<ProjectInfo>,
    },
}

/// Everything needed to issue one upstream call.
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Value>,
}

fn auth_headers(config: &ProviderConfig, access: &Access) -> Result<HeaderMap, CastorError> {
    let mut map = HeaderMap::new();
    match access {
        Access::None => {}
        Access::ApiKey(key) => match config.kind {
            ProviderKind::Gemini => headers::goog_api_key(&mut map, key)?,
            ProviderKind::Anthropic => {
                headers::bearer(&mut map, key)?;
                headers::anthropic_key(&mut map, key)?;
            }
            _ => headers::bearer(&mut map, key)?,
        },
        Access::OAuth { access_token, .. } => headers::bearer(&mut map, access_token)?,
    }
    if config.kind == ProviderKind::Agentic {
        headers::code_assist_bundle(&mut map);
    }
    headers::apply_custom(&mut map, &config.custom_headers);
    Ok(map)
}

fn gemini_model_path(model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("/v1beta/models/{model}")
}

fn chat_endpoints(
    config: &ProviderConfig,
    model: &str,
    access: &Access,
) -> Result<ProviderEndpoints, CastorError> {
    let base = &config.base_url;
    Ok(match config.kind {
        ProviderKind::OpenAiCompatible | ProviderKind::Anthropic => {
            ProviderEndpoints::single(base, "/v1/chat/completions")
        }
        ProviderKind::Copilot => ProviderEndpoints::single(base, "/chat/completions"),
        ProviderKind::Ollama => ProviderEndpoints::single(base, "/api/chat"),
        ProviderKind::Gemini => {
            let path = gemini_model_path(model);
            ProviderEndpoints::new(
                base,
                &format!("{path}:streamGenerateContent"),
                Some("alt=sse"),
                &format!("{path}:generateContent"),
                None,
            )
        }
        ProviderKind::Agentic => {
            let Access::OAuth {
                project: Some(project),
                ..
            } = access
            else {
                return Err(CastorError::Config(format!(
                    "provider {} needs a resolved Code Assist project",
                    config.id
                )));
            };
            gemini::code_assist_endpoints(&project.endpoint)
        }
    })
}

/// Build the chat call for `req`, streaming or not.
pub(crate) fn prepare_chat(
    req: &ChatRequest,
    access: &Access,
    stream: bool,
) -> Result<PreparedRequest, CastorError> {
    let config = req.config.as_ref();
    if req.model.trim().is_empty() {
        return Err(CastorError::Config(format!(
            "no model selected for provider {}",
            config.id
        )));
    }

    let url = chat_endpoints(config, &req.model, access)?.into_selected(stream);
    let headers = auth_headers(config, access)?;
    let body = match config.kind {
        ProviderKind::OpenAiCompatible | ProviderKind::Anthropic | ProviderKind::Copilot => {
            serde_json::to_value(openai::encode(req, stream))?
        }
        ProviderKind::Ollama => serde_json::to_value(ollama::encode(req, stream))?,
        ProviderKind::Gemini => serde_json::to_value(gemini::encode(req))?,
        ProviderKind::Agentic => {
            let project_id = match access {
                Access::OAuth {
                    project: Some(project),
                    ..
                } => project.project_id.clone(),
                _ => String::new(),
            };
            serde_json::to_value(gemini::encode_code_assist(req, project_id))?
        }
    };

    Ok(PreparedRequest {
        url,
        headers,
        body: Some(body),
    })
}

/// Listing call for `config`; `None` when the provider has no listing endpoint.
pub(crate) fn prepare_models(
    config: &ProviderConfig,
    access: &Access,
) -> Result<Option<PreparedRequest>, CastorError> {
    let path = match config.kind {
        ProviderKind::OpenAiCompatible | ProviderKind::Anthropic => "/v1/models",
        ProviderKind::Copilot => "/models",
        ProviderKind::Ollama => "/api/tags",
        ProviderKind::Gemini => "/v1beta/models",
        ProviderKind::Agentic => return Ok(None),
    };
    Ok(Some(PreparedRequest {
        url: ProviderEndpoints::single(&config.base_url, path).into_selected(false),
        headers: auth_headers(config, access)?,
        body: None,
    }))
}

/// Attachments of `message` the provider can accept; the rest are dropped with a warning.
pub(crate) fn accepted_attachments<'a>(
    config: &ProviderConfig,
    message: &'a ConversationMessage,
) -> Vec<&'a Attachment> {
    message
        .attachments
        .iter()
        .filter(|attachment| {
            let accepted = (attachment.is_image() && config.capabilities.images)
                || (attachment.is_pdf() && config.capabilities.pdf);
            if !accepted {
                warn!(
                    provider = %config.id,
                    mime = %attachment.mime_type,
                    "Dropping attachment the provider does not support"
                );
            }
            accepted
        })
        .collect()
}

/// One SSE line, split into the parts parsers care about.
pub(crate) enum SseLine<'a> {
    Blank,
    Comment,
    Data(&'a str),
    /// `event:`, `id:`, `retry:` and anything unrecognized.
    Other,
}

pub(crate) fn classify_sse(line: &str) -> SseLine<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return SseLine::Blank;
    }
    if line.starts_with(':') {
        return SseLine::Comment;
    }
    match line.strip_prefix("data:") {
        Some(payload) => SseLine::Data(payload.strip_prefix(' ').unwrap_or(payload).trim_end()),
        None => SseLine::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capabilities, Credentials};
    use std::sync::Arc;

    fn config(kind: ProviderKind, base: &str) -> ProviderConfig {
        ProviderConfig::new("p", kind, Url::parse(base).unwrap()).with_default_model("m-1")
    }

    fn request(config: ProviderConfig) -> ChatRequest {
        ChatRequest::new(
            Arc::new(config),
            vec![ConversationMessage::user("hello")],
        )
        .with_credentials(Credentials::ApiKey("k".into()))
    }

    #[test]
    fn kinds_map_to_dialects() {
        assert_eq!(Dialect::for_kind(ProviderKind::Anthropic), Dialect::OpenAi);
        assert_eq!(Dialect::for_kind(ProviderKind::Copilot), Dialect::OpenAi);
        assert_eq!(Dialect::for_kind(ProviderKind::Ollama), Dialect::Ollama);
        assert_eq!(Dialect::for_kind(ProviderKind::Agentic), Dialect::Gemini);
        assert!(Dialect::Gemini.implicit_done());
    }

    #[test]
    fn openai_chat_call_shape() {
        let req = request(config(ProviderKind::OpenAiCompatible, "https://api.example.com/v1"));
        let call = prepare_chat(&req, &Access::ApiKey("k".into()), true).unwrap();

        assert_eq!(call.url.as_str(), "https://api.example.com/v1/chat/completions");
        assert_eq!(call.headers["authorization"], "Bearer k");
        let body = call.body.unwrap();
        assert_eq!(body["model"], "m-1");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn copilot_has_no_version_prefix() {
        let req = request(config(ProviderKind::Copilot, "https://api.githubcopilot.com"));
        let call = prepare_chat(&req, &Access::ApiKey("k".into()), true).unwrap();
        assert_eq!(call.url.as_str(), "https://api.githubcopilot.com/chat/completions");
    }

    #[test]
    fn ollama_sends_no_auth_header() {
        let req = request(config(ProviderKind::Ollama, "http://127.0.0.1:11434"));
        let call = prepare_chat(&req, &Access::None, true).unwrap();
        assert_eq!(call.url.as_str(), "http://127.0.0.1:11434/api/chat");
        assert!(!call.headers.contains_key("authorization"));
    }

    #[test]
    fn gemini_uses_api_key_header_and_model_path() {
        let req = request(config(
            ProviderKind::Gemini,
            "https://generativelanguage.googleapis.com",
        ))
        .with_model("models/gemini-2.5-flash");

        let stream = prepare_chat(&req, &Access::ApiKey("g".into()), true).unwrap();
        assert_eq!(
            stream.url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
        assert_eq!(stream.headers["x-goog-api-key"], "g");
        assert!(!stream.headers.contains_key("authorization"));

        let unary = prepare_chat(&req, &Access::ApiKey("g".into()), false).unwrap();
        assert!(unary.url.as_str().ends_with(":generateContent"));
    }

    #[test]
    fn agentic_requires_resolved_project() {
        let req = request(config(ProviderKind::Agentic, "https://cloudcode-pa.googleapis.com"));
        let access = Access::OAuth {
            access_token: "t".into(),
            project: None,
        };
        assert!(matches!(
            prepare_chat(&req, &access, true),
            Err(CastorError::Config(_))
        ));

        let access = Access::OAuth {
            access_token: "t".into(),
            project: Some(ProjectInfo {
                endpoint: Url::parse("https://daily-cloudcode-pa.googleapis.com").unwrap(),
                project_id: "proj-1".into(),
                fallback: false,
            }),
        };
        let call = prepare_chat(&req, &access, true).unwrap();
        assert_eq!(
            call.url.as_str(),
            "https://daily-cloudcode-pa.googleapis.com/v1internal:streamGenerateContent?alt=sse"
        );
        assert_eq!(call.headers["authorization"], "Bearer t");
        assert_eq!(call.headers["user-agent"], headers::CODE_ASSIST_USER_AGENT);
        let body = call.body.unwrap();
        assert_eq!(body["project"], "proj-1");
        assert_eq!(body["requestType"], "agent");
    }

    #[test]
    fn empty_model_is_rejected() {
        let req = request(config(ProviderKind::Ollama, "http://localhost:11434")).with_model(" ");
        assert!(matches!(
            prepare_chat(&req, &Access::None, true),
            Err(CastorError::Config(_))
        ));
    }

    #[test]
    fn model_listing_paths() {
        let cases = [
            (ProviderKind::OpenAiCompatible, "https://h/v1/models"),
            (ProviderKind::Anthropic, "https://h/v1/models"),
            (ProviderKind::Copilot, "https://h/models"),
            (ProviderKind::Ollama, "https://h/api/tags"),
            (ProviderKind::Gemini, "https://h/v1beta/models"),
        ];
        for (kind, expected) in cases {
            let call = prepare_models(&config(kind, "https://h"), &Access::None)
                .unwrap()
                .unwrap();
            assert_eq!(call.url.as_str(), expected, "{kind:?}");
            assert!(call.body.is_none());
        }
        assert!(
            prepare_models(&config(ProviderKind::Agentic, "https://h"), &Access::None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn anthropic_gets_native_key_headers() {
        let call = prepare_models(
            &config(ProviderKind::Anthropic, "https://api.anthropic.com"),
            &Access::ApiKey("sk-ant".into()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(call.headers["x-api-key"], "sk-ant");
        assert_eq!(call.headers["anthropic-version"], "2023-06-01");
    }

    #[test]
    fn attachments_follow_capabilities() {
        let message = ConversationMessage::user("look")
            .with_attachment(Attachment {
                mime_type: "image/png".into(),
                data: "aW1n".into(),
                file_name: None,
            })
            .with_attachment(Attachment {
                mime_type: "application/pdf".into(),
                data: "cGRm".into(),
                file_name: Some("a.pdf".into()),
            })
            .with_attachment(Attachment {
                mime_type: "audio/wav".into(),
                data: "d2F2".into(),
                file_name: None,
            });

        let images_only = config(ProviderKind::OpenAiCompatible, "https://h").with_capabilities(
            Capabilities {
                images: true,
                ..Capabilities::default()
            },
        );
        let kept = accepted_attachments(&images_only, &message);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_image());

        let nothing = config(ProviderKind::OpenAiCompatible, "https://h");
        assert!(accepted_attachments(&nothing, &message).is_empty());
    }

    #[test]
    fn sse_lines_are_classified() {
        assert!(matches!(classify_sse(""), SseLine::Blank));
        assert!(matches!(classify_sse("\r"), SseLine::Blank));
        assert!(matches!(classify_sse(": ping"), SseLine::Comment));
        assert!(matches!(classify_sse("event: message"), SseLine::Other));
        assert!(matches!(classify_sse("data: {\"a\":1}\r"), SseLine::Data("{\"a\":1}")));
        assert!(matches!(classify_sse("data:[DONE]"), SseLine::Data("[DONE]")));
    }
}
