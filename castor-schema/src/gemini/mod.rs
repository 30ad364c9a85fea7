mod error_body;
mod generate_content_request;
mod model_list;
mod response;

pub use error_body::{GeminiErrorBody, GeminiErrorObject};
pub use generate_content_request::GeminiGenerateContentRequest;
pub use generate_content_request::{Content, GenerationConfig, Part, ThinkingConfig};
pub use model_list::{GeminiModel, GeminiModelList};
pub use response::{Candidate, GeminiResponseBody};
