//! Caller-facing data model shared by every layer of the crate.

mod event;
mod message;
mod model;
mod provider;
mod tokens;

pub use event::{ContentKind, ErrorCode, UnifiedStreamEvent};
pub use message::{
    Attachment, ChatRequest, ConversationMessage, Credentials, ReasoningEffort, Role,
};
pub use model::{ModelInfo, ProjectInfo};
pub use provider::{AuthKind, Capabilities, ProviderConfig, ProviderKind};
pub use tokens::{OAuthState, OAuthTokens, TokenField};
