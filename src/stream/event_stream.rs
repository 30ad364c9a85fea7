use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::types::UnifiedStreamEvent;

/// Lazy, single-pass sequence of events for one streaming call.
///
/// The upstream request is not sent until the stream is first polled. Once
/// the call is cancelled (through the controller, [`EventStream::cancel`] or
/// by dropping the stream) no further event is yielded, even if some were
/// already buffered.
#[derive(Debug)]
pub struct EventStream {
    inner: ReceiverStream<UnifiedStreamEvent>,
    cancel: CancellationToken,
    start: Option<oneshot::Sender<()>>,
}

impl EventStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<UnifiedStreamEvent>,
        cancel: CancellationToken,
        start: oneshot::Sender<()>,
    ) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            cancel,
            start: Some(start),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for EventStream {
    type Item = UnifiedStreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        if let Some(start) = self.start.take() {
            let _ = start.send(());
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
