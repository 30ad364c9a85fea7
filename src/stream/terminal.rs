use tracing::{debug, warn};

use crate::error::{CastorError, TransportKind};
use crate::providers::{Dialect, ParsedLine};
use crate::types::UnifiedStreamEvent;
use crate::utils::logging::truncate_body;

/// Per-call bookkeeping that decides how a stream ends.
///
/// Feeds each line through the dialect parser, flags the first content chunk,
/// cuts everything after the first terminal event and, when the body ends
/// without one, picks the synthetic terminal event in [`StreamTracker::finish`].
#[derive(Debug)]
pub(crate) struct StreamTracker {
    dialect: Dialect,
    content_seen: bool,
    terminated: bool,
    last_malformed: Option<String>,
}

impl StreamTracker {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            content_seen: false,
            terminated: false,
            last_malformed: None,
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Events to forward for one line of the response body.
    pub(crate) fn on_line(&mut self, line: &str) -> Vec<UnifiedStreamEvent> {
        if self.terminated {
            return Vec::new();
        }

        match self.dialect.parse_line(line) {
            ParsedLine::Skip => Vec::new(),
            ParsedLine::Malformed { reason } => {
                debug!(line = %truncate_body(line), "Malformed line content");
                self.on_malformed(reason)
            }
            ParsedLine::Events(events) => {
                self.last_malformed = None;
                let mut out = Vec::with_capacity(events.len());
                for mut event in events {
                    if let UnifiedStreamEvent::Content { is_first_chunk, .. } = &mut event {
                        *is_first_chunk = !self.content_seen;
                        self.content_seen = true;
                    }
                    let terminal = event.is_terminal();
                    out.push(event);
                    if terminal {
                        self.terminated = true;
                        break;
                    }
                }
                out
            }
        }
    }

    /// Records a line that could not be decoded at all.
    pub(crate) fn on_malformed(&mut self, reason: String) -> Vec<UnifiedStreamEvent> {
        if !self.terminated {
            warn!(dialect = ?self.dialect, %reason, "Skipping malformed stream line");
            self.last_malformed = Some(reason);
        }
        Vec::new()
    }

    /// Terminal event for a body that ended without one.
    pub(crate) fn finish(&mut self) -> UnifiedStreamEvent {
        self.terminated = true;

        if let Some(reason) = self.last_malformed.take() {
            return CastorError::ParseFailure(reason).into();
        }
        if !self.content_seen {
            return CastorError::EmptyStream.into();
        }
        if self.dialect.implicit_done() {
            debug!(dialect = ?self.dialect, "Stream closed after content, synthesizing Done");
            return UnifiedStreamEvent::done(None, None);
        }
        CastorError::Transport {
            kind: TransportKind::Other,
            message: "stream closed without a terminal event".to_string(),
        }
        .into()
    }
}
