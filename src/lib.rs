pub mod client;
pub mod config;
mod credentials;
pub mod error;
pub mod oauth;
mod oauth_utils;
pub mod providers;
pub mod stream;
pub mod types;
mod utils;

pub use client::ChatClient;
pub use config::Config;
pub use error::{CastorError, IsRecoverable, OauthError};
pub use oauth::{AuthState, MemoryTokenStore, OAuthManager, TokenStore};
pub use stream::{EventStream, StreamController};
pub use types::{
    ChatRequest, ConversationMessage, Credentials, ModelInfo, ProviderConfig, ProviderKind,
    UnifiedStreamEvent,
};
