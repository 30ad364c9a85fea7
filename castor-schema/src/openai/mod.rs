mod chat_chunk;
mod chat_request;
mod model_list;

pub use chat_chunk::{
    OpenaiChatCompletion, OpenaiChunkChoice, OpenaiCompletionChoice, OpenaiDelta, OpenaiErrorObject,
    OpenaiStreamChunk,
};
pub use chat_request::{
    OpenaiChatRequest, OpenaiContent, OpenaiContentPart, OpenaiFile, OpenaiImageUrl, OpenaiMessage,
};
pub use model_list::{OpenaiModel, OpenaiModelList};
