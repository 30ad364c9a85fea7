use tracing::debug;

use crate::error::CastorError;
use crate::oauth::OAuthManager;
use crate::providers::Access;
use crate::types::{AuthKind, Credentials, ProviderConfig, ProviderKind};

/// Turn caller credentials into header material for `config`.
///
/// OAuth providers get a valid access token from `oauth` (refreshing if
/// needed); Code Assist providers additionally get their resolved project.
pub(crate) async fn resolve_access(
    oauth: &OAuthManager,
    config: &ProviderConfig,
    credentials: &Credentials,
) -> Result<Access, CastorError> {
    match (credentials, config.auth) {
        (Credentials::ApiKey(key), _) => {
            let key = key.trim();
            return if key.is_empty() {
                Err(CastorError::AuthRequired)
            } else {
                Ok(Access::ApiKey(key.to_string()))
            };
        }
        (Credentials::None, AuthKind::None) => return Ok(Access::None),
        (Credentials::None, AuthKind::ApiKey) => return Err(CastorError::AuthRequired),
        (Credentials::None, AuthKind::OAuth) | (Credentials::OAuth, _) => {}
    }

    let access_token = oauth.get_valid_access_token(&config.id).await?;
    let project = if config.kind == ProviderKind::Agentic {
        let project = oauth.resolve_project(&config.id, &access_token).await?;
        debug!(
            provider = %config.id,
            project = %project.project_id,
            endpoint = %project.endpoint,
            fallback = project.fallback,
            "Using Code Assist project"
        );
        Some(project)
    } else {
        None
    };

    Ok(Access::OAuth {
        access_token,
        project,
    })
}
