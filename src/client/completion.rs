use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::ChatClient;
use crate::credentials::resolve_access;
use crate::error::CastorError;
use crate::providers::{Dialect, http_failure, prepare_chat};
use crate::types::{ChatRequest, ConversationMessage, Credentials, ProviderConfig, ProviderKind};

impl ChatClient {
    /// One non-streaming turn with a single user `prompt`; returns the answer
    /// text with thought parts left out. `model` falls back to the provider's
    /// default model.
    pub async fn generate_simple_completion(
        &self,
        config: Arc<ProviderConfig>,
        credentials: Credentials,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, CastorError> {
        let mut req = ChatRequest::new(config.clone(), vec![ConversationMessage::user(prompt)])
            .with_credentials(credentials);
        if let Some(model) = model.filter(|model| !model.trim().is_empty()) {
            req = req.with_model(model);
        }

        let access = resolve_access(&self.oauth, &config, &req.credentials).await?;
        let call = prepare_chat(&req, &access, false)?;

        info!(
            provider = %config.id,
            kind = config.kind.as_str(),
            req.model = %req.model,
            "[Completion] Post -> {}",
            req.model
        );
        let mut builder = self
            .http
            .post(call.url)
            .headers(call.headers)
            .timeout(self.request_timeout);
        if let Some(body) = &call.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
                && config.kind == ProviderKind::Agentic
            {
                self.oauth.invalidate_project(&config.id);
            }
            let err = http_failure(resp).await;
            warn!(provider = %config.id, %status, error = %err, "[Completion] upstream error");
            return Err(err);
        }

        let body = resp.bytes().await?;
        let text = Dialect::for_kind(config.kind).completion_text(&body)?;
        debug!(provider = %config.id, chars = text.chars().count(), "[Completion] done");
        Ok(text)
    }
}
