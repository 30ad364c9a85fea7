use std::fmt;

/// Whether a content delta is user-visible answer text or model reasoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    #[default]
    Answer,
    Thought,
}

/// Machine-readable classification of a terminal stream error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    AuthRequired,
    Http(u16),
    Timeout,
    Connect,
    Transport,
    EmptyStream,
    Parse,
    /// Error code reported in-band by the upstream.
    Upstream(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::AuthRequired => f.write_str("AUTH_REQUIRED"),
            ErrorCode::Http(status) => write!(f, "{status}"),
            ErrorCode::Timeout => f.write_str("TIMEOUT"),
            ErrorCode::Connect => f.write_str("CONNECT"),
            ErrorCode::Transport => f.write_str("TRANSPORT"),
            ErrorCode::EmptyStream => f.write_str("EMPTY_STREAM"),
            ErrorCode::Parse => f.write_str("PARSE_FAILURE"),
            ErrorCode::Upstream(code) => f.write_str(code),
        }
    }
}

/// Dialect-independent streaming event.
///
/// A well-formed stream carries exactly one terminal event (`Done` or `Error`)
/// and nothing after it.
#[derive(Debug, Clone, PartialEq)]
pub enum UnifiedStreamEvent {
    Content {
        text: String,
        /// Set on the first content event of the call only.
        is_first_chunk: bool,
        kind: ContentKind,
    },
    Done {
        finish_reason: Option<String>,
        model_id: Option<String>,
    },
    Error {
        message: String,
        code: Option<ErrorCode>,
        recoverable: bool,
    },
    Connected,
    KeepAlive,
}

impl UnifiedStreamEvent {
    pub fn answer(text: impl Into<String>) -> Self {
        UnifiedStreamEvent::Content {
            text: text.into(),
            is_first_chunk: false,
            kind: ContentKind::Answer,
        }
    }

    pub fn thought(text: impl Into<String>) -> Self {
        UnifiedStreamEvent::Content {
            text: text.into(),
            is_first_chunk: false,
            kind: ContentKind::Thought,
        }
    }

    pub fn done(finish_reason: Option<String>, model_id: Option<String>) -> Self {
        UnifiedStreamEvent::Done {
            finish_reason,
            model_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnifiedStreamEvent::Done { .. } | UnifiedStreamEvent::Error { .. }
        )
    }
}
