pub mod codeassist;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use codeassist::{CodeAssistRequestBody, CodeAssistRequestMeta, CodeAssistResponseBody};
pub use gemini::{GeminiGenerateContentRequest, GeminiResponseBody};
pub use ollama::{OllamaChatRequest, OllamaStreamChunk};
pub use openai::{OpenaiChatRequest, OpenaiStreamChunk};
