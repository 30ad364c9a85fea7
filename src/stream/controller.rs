use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use reqwest::StatusCode;
use tokio::sync::{mpsc, oneshot};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event_stream::EventStream;
use super::pump::{Emitter, pump_lines};
use crate::credentials::resolve_access;
use crate::error::CastorError;
use crate::oauth::OAuthManager;
use crate::providers::{Dialect, http_failure, prepare_chat};
use crate::types::{ChatRequest, ErrorCode, ProviderKind, UnifiedStreamEvent};
use crate::utils::logging::with_pretty_json_debug;

const EVENT_BUFFER: usize = 64;

#[derive(Debug)]
struct ActiveStream {
    id: u64,
    cancel: CancellationToken,
}

/// Runs at most one streaming chat call at a time; starting a new one
/// cancels the previous.
pub struct StreamController {
    http: reqwest::Client,
    oauth: Arc<OAuthManager>,
    read_timeout: Duration,
    active: Arc<Mutex<Option<ActiveStream>>>,
    next_id: AtomicU64,
}

impl StreamController {
    pub fn new(http: reqwest::Client, oauth: Arc<OAuthManager>, read_timeout: Duration) -> Self {
        Self {
            http,
            oauth,
            read_timeout,
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start streaming `req`. Must be called inside a Tokio runtime; the
    /// request goes out when the returned stream is first polled.
    pub fn stream_chat(&self, req: ChatRequest) -> EventStream {
        let cancel = CancellationToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ActiveStream {
                id,
                cancel: cancel.clone(),
            });
        if let Some(previous) = previous {
            debug!(stream.id = previous.id, "Cancelling previous stream");
            previous.cancel.cancel();
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (start_tx, start_rx) = oneshot::channel();
        let call = StreamCall {
            http: self.http.clone(),
            oauth: self.oauth.clone(),
            read_timeout: self.read_timeout,
            req,
        };
        let emitter = Emitter::new(tx, cancel.clone());
        let active = self.active.clone();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let started = tokio::select! {
                biased;
                () = task_cancel.cancelled() => false,
                started = start_rx => started.is_ok(),
            };
            if started {
                tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => {
                        debug!(stream.id = id, "Stream call aborted");
                    }
                    () = call.run(&emitter) => {}
                }
            }

            let mut active = active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.as_ref().is_some_and(|current| current.id == id) {
                *active = None;
            }
        });

        EventStream::new(rx, cancel, start_tx)
    }

    /// Cancel the active stream, if any. Idempotent.
    pub fn cancel_streaming(&self) {
        let active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = active {
            info!(stream.id = active.id, "Streaming cancelled by caller");
            active.cancel.cancel();
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

struct StreamCall {
    http: reqwest::Client,
    oauth: Arc<OAuthManager>,
    read_timeout: Duration,
    req: ChatRequest,
}

impl StreamCall {
    async fn run(self, emitter: &Emitter) {
        let config = self.req.config.clone();
        let provider = config.id.as_str();
        let dialect = Dialect::for_kind(config.kind);

        let access =
            match resolve_access(&self.oauth, &config, &self.req.credentials).await {
                Ok(access) => access,
                Err(err) => {
                    warn!(provider = %provider, error = %err, "[Stream] credentials unavailable");
                    emitter
                        .emit(UnifiedStreamEvent::Error {
                            message: err.to_string(),
                            code: Some(ErrorCode::AuthRequired),
                            recoverable: true,
                        })
                        .await;
                    return;
                }
            };

        let call = match prepare_chat(&self.req, &access, true) {
            Ok(call) => call,
            Err(err) => {
                emitter.emit(err.into()).await;
                return;
            }
        };

        if let Some(body) = &call.body {
            with_pretty_json_debug(body, |pretty| {
                debug!(
                    provider = %provider,
                    req.model = %self.req.model,
                    url = %call.url,
                    body = %pretty,
                    "[Stream] prepared upstream payload"
                );
            });
        }

        let start = Instant::now();
        info!(
            provider = %provider,
            kind = config.kind.as_str(),
            req.model = %self.req.model,
            "[Stream] Post -> {}",
            self.req.model
        );

        let mut builder = self.http.post(call.url).headers(call.headers);
        if let Some(body) = &call.body {
            builder = builder.json(body);
        }
        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(err) => {
                let err = CastorError::from(err);
                warn!(provider = %provider, error = %err, "[Stream] transport failure");
                emitter.emit(err.into()).await;
                return;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
                && config.kind == ProviderKind::Agentic
            {
                self.oauth.invalidate_project(provider);
            }
            let err = http_failure(resp).await;
            warn!(provider = %provider, %status, error = %err, "[Stream] upstream error");
            emitter.emit(err.into()).await;
            return;
        }

        debug!(
            provider = %provider,
            %status,
            waited_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "[Stream] connected"
        );
        if !emitter.emit(UnifiedStreamEvent::Connected).await {
            return;
        }

        let reader = StreamReader::new(Box::pin(resp.bytes_stream().map_err(io::Error::other)));
        pump_lines(reader, dialect, self.read_timeout, emitter).await;
        debug!(
            provider = %provider,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "[Stream] finished"
        );
    }
}
