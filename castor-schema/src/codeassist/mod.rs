//! Google Code Assist (`v1internal`) wire types.
//!
//! The agentic provider wraps Gemini generate-content bodies in an envelope and
//! discovers its billing project through `loadCodeAssist` / `onboardUser`.

mod project;
mod request;
mod response;

pub use project::{
    AllowedTier, ClientMetadata, LoadCodeAssistRequest, LoadCodeAssistResponse,
    OnboardUserOperation, OnboardUserRequest, OnboardUserResponse, ProjectIdOrObject,
};
pub use request::{CodeAssistRequestBody, CodeAssistRequestMeta};
pub use response::CodeAssistResponseBody;
