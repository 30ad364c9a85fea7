//! Streaming chat calls: one active call per controller, line pumping with
//! per-line read timeouts and the end-of-stream rules.

mod controller;
mod event_stream;
mod pump;
mod terminal;

pub use controller::StreamController;
pub use event_stream::EventStream;
