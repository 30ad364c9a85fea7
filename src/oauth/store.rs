use ahash::AHashMap;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CastorError;
use crate::types::{OAuthTokens, TokenField};

/// Per-provider secret storage supplied by the host application.
///
/// Values are plain strings; encrypting them at rest is up to the implementor.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, provider_id: &str, field: TokenField)
    -> Result<Option<String>, CastorError>;

    async fn set(&self, provider_id: &str, field: TokenField, value: &str)
    -> Result<(), CastorError>;

    async fn clear(&self, provider_id: &str, field: TokenField) -> Result<(), CastorError>;
}

/// Process-local [`TokenStore`].
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<AHashMap<(String, TokenField), String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(
        &self,
        provider_id: &str,
        field: TokenField,
    ) -> Result<Option<String>, CastorError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(provider_id.to_string(), field)).cloned())
    }

    async fn set(
        &self,
        provider_id: &str,
        field: TokenField,
        value: &str,
    ) -> Result<(), CastorError> {
        self.entries
            .write()
            .await
            .insert((provider_id.to_string(), field), value.to_string());
        Ok(())
    }

    async fn clear(&self, provider_id: &str, field: TokenField) -> Result<(), CastorError> {
        self.entries
            .write()
            .await
            .remove(&(provider_id.to_string(), field));
        Ok(())
    }
}

/// Assemble stored fields into [`OAuthTokens`]; `None` without an access token.
pub(crate) async fn load_tokens(
    store: &dyn TokenStore,
    provider_id: &str,
) -> Result<Option<OAuthTokens>, CastorError> {
    let Some(access_token) = store
        .get(provider_id, TokenField::AccessToken)
        .await?
        .filter(|token| !token.is_empty())
    else {
        return Ok(None);
    };

    let expires_at = store
        .get(provider_id, TokenField::ExpiresAt)
        .await?
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(0);

    Ok(Some(OAuthTokens {
        access_token,
        refresh_token: store.get(provider_id, TokenField::RefreshToken).await?,
        expires_at,
        token_type: "Bearer".to_string(),
        email: store.get(provider_id, TokenField::Email).await?,
        project_id: store.get(provider_id, TokenField::ProjectId).await?,
    }))
}

/// Persist every field of `tokens`, clearing optional fields that are unset.
pub(crate) async fn save_tokens(
    store: &dyn TokenStore,
    provider_id: &str,
    tokens: &OAuthTokens,
) -> Result<(), CastorError> {
    store
        .set(provider_id, TokenField::AccessToken, &tokens.access_token)
        .await?;
    store
        .set(
            provider_id,
            TokenField::ExpiresAt,
            &tokens.expires_at.to_string(),
        )
        .await?;

    let optional = [
        (TokenField::RefreshToken, &tokens.refresh_token),
        (TokenField::Email, &tokens.email),
        (TokenField::ProjectId, &tokens.project_id),
    ];
    for (field, value) in optional {
        match value {
            Some(value) => store.set(provider_id, field, value).await?,
            None => store.clear(provider_id, field).await?,
        }
    }
    Ok(())
}

pub(crate) async fn clear_tokens(
    store: &dyn TokenStore,
    provider_id: &str,
) -> Result<(), CastorError> {
    for field in TokenField::ALL {
        store.clear(provider_id, field).await?;
    }
    Ok(())
}
