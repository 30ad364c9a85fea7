//! OAuth 2.0 authorization-code flow with PKCE, token persistence and refresh.

mod endpoints;
mod manager;
mod pkce;
mod state;
mod store;

pub use endpoints::OAuthClientSettings;
pub use manager::{AuthState, OAuthManager};
pub use pkce::{PkceGenerator, PkcePair};
pub use state::OAuthStateCodec;
pub use store::{MemoryTokenStore, TokenStore};
