mod dialect;
mod gemini;
mod headers;
mod ollama;
mod openai;
mod policy;
mod project;
mod provider_endpoints;

pub use dialect::{Dialect, ParsedLine};
pub use project::ProjectResolver;

pub(crate) use dialect::{Access, PreparedRequest, prepare_chat, prepare_models};
pub(crate) use policy::{failure_from_body, http_failure};
