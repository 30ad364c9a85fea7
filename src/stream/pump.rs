use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::terminal::StreamTracker;
use crate::error::{CastorError, TransportKind};
use crate::providers::Dialect;
use crate::types::UnifiedStreamEvent;

/// Event sink of one streaming call; refuses to send once cancelled.
pub(crate) struct Emitter {
    tx: mpsc::Sender<UnifiedStreamEvent>,
    cancel: CancellationToken,
}

impl Emitter {
    pub(crate) fn new(tx: mpsc::Sender<UnifiedStreamEvent>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// `false` once the consumer is gone or the call was cancelled.
    pub(crate) async fn emit(&self, event: UnifiedStreamEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }
}

fn io_failure(err: &io::Error) -> CastorError {
    if let Some(source) = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
    {
        return CastorError::Transport {
            kind: if source.is_timeout() {
                TransportKind::Timeout
            } else {
                TransportKind::Connect
            },
            message: source.to_string(),
        };
    }
    CastorError::Transport {
        kind: TransportKind::Other,
        message: err.to_string(),
    }
}

/// `line` without its `\n` or `\r\n` ending.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Read `reader` line by line until a terminal event, cancellation or EOF.
///
/// Each read is bounded by `read_timeout`. Exactly one terminal event is
/// emitted unless the call is cancelled first. A line that is not valid UTF-8
/// counts as malformed.
pub(crate) async fn pump_lines<R>(
    mut reader: R,
    dialect: Dialect,
    read_timeout: Duration,
    emitter: &Emitter,
) where
    R: AsyncBufRead + Unpin,
{
    let mut tracker = StreamTracker::new(dialect);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let next = tokio::select! {
            biased;
            () = emitter.cancel.cancelled() => {
                debug!("Stream cancelled while waiting for the next line");
                return;
            }
            next = tokio::time::timeout(read_timeout, reader.read_until(b'\n', &mut buf)) => next,
        };

        match next {
            Err(_elapsed) => {
                let err = CastorError::Transport {
                    kind: TransportKind::Timeout,
                    message: format!("no data received for {}s", read_timeout.as_secs()),
                };
                emitter.emit(err.into()).await;
                return;
            }
            Ok(Err(err)) => {
                emitter.emit(io_failure(&err).into()).await;
                return;
            }
            Ok(Ok(0)) => {
                emitter.emit(tracker.finish()).await;
                return;
            }
            Ok(Ok(_)) => {}
        }

        let events = match std::str::from_utf8(trim_line_ending(&buf)) {
            Ok(line) => tracker.on_line(line),
            Err(err) => tracker.on_malformed(format!("line is not valid UTF-8: {err}")),
        };
        for event in events {
            if !emitter.emit(event).await {
                return;
            }
        }
        if tracker.is_terminated() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCode;
    use tokio::io::BufReader;

    async fn pump(body: &'static [u8], dialect: Dialect) -> Vec<UnifiedStreamEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        let emitter = Emitter::new(tx, CancellationToken::new());
        pump_lines(BufReader::new(body), dialect, Duration::from_secs(5), &emitter).await;
        drop(emitter);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn crlf_sse_body_is_parsed() {
        let events = pump(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n",
            Dialect::OpenAi,
        )
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], UnifiedStreamEvent::Content { text, is_first_chunk: true, .. } if text == "Hi"));
        assert_eq!(events[1], UnifiedStreamEvent::done(None, None));
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_read() {
        let events = pump(
            b"{\"message\":{\"content\":\"a\"},\"done\":false}\n{\"done\":true,\"done_reason\":\"stop\"}",
            Dialect::Ollama,
        )
        .await;
        assert_eq!(
            events.last(),
            Some(&UnifiedStreamEvent::done(Some("stop".into()), None))
        );
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let events = pump(
            b"{\"message\":{\"content\":\"a\"},\"done\":false}\n{\"message\":{\"content\":\"\xff\"},\"done\":false}\n{\"done\":true}\n",
            Dialect::Ollama,
        )
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], UnifiedStreamEvent::Content { text, .. } if text == "a"));
        assert_eq!(events[1], UnifiedStreamEvent::done(None, None));
    }

    #[tokio::test]
    async fn invalid_utf8_last_line_is_parse_failure() {
        let events = pump(
            b"{\"message\":{\"content\":\"a\"},\"done\":false}\n\xff\xfe\n",
            Dialect::Ollama,
        )
        .await;
        assert!(matches!(
            events.last(),
            Some(UnifiedStreamEvent::Error {
                code: Some(ErrorCode::Parse),
                recoverable: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn empty_body_is_empty_stream() {
        let events = pump(b"", Dialect::Gemini).await;
        assert!(matches!(
            events.as_slice(),
            [UnifiedStreamEvent::Error {
                code: Some(ErrorCode::EmptyStream),
                ..
            }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_upstream_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(4);
        let emitter = Emitter::new(tx, CancellationToken::new());

        pump_lines(
            BufReader::new(client),
            Dialect::OpenAi,
            Duration::from_secs(300),
            &emitter,
        )
        .await;

        assert!(matches!(
            rx.recv().await,
            Some(UnifiedStreamEvent::Error {
                code: Some(ErrorCode::Timeout),
                recoverable: true,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cancelled_pump_emits_nothing() {
        let (client, _server) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let emitter = Emitter::new(tx, token.clone());
        token.cancel();

        pump_lines(
            BufReader::new(client),
            Dialect::OpenAi,
            Duration::from_secs(300),
            &emitter,
        )
        .await;
        drop(emitter);
        assert!(rx.recv().await.is_none());
    }
}
