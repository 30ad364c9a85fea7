mod castor;
mod oauth;

pub use castor::{CastorError, TransportKind};
pub use oauth::OauthError;

/// Whether a failure is worth retrying by the caller (network, 429, 5xx).
pub trait IsRecoverable {
    fn is_recoverable(&self) -> bool;
}
