mod chat;
mod tags;

pub use chat::{OllamaChatRequest, OllamaMessage, OllamaOptions, OllamaStreamChunk};
pub use tags::{OllamaModel, OllamaTags};
