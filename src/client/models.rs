use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use super::ChatClient;
use crate::credentials::resolve_access;
use crate::error::CastorError;
use crate::providers::{Dialect, failure_from_body, prepare_models};
use crate::types::{Credentials, ModelInfo, ProviderConfig};
use crate::utils::logging::truncate_body;

fn starts_with_markup(body: &[u8]) -> bool {
    body.iter()
        .find(|byte| !byte.is_ascii_whitespace())
        .is_some_and(|byte| *byte == b'<')
}

/// An HTML page (a login wall, a web UI, a 404 page) served where JSON was expected.
fn looks_like_html(content_type: &str, body: &[u8]) -> bool {
    starts_with_markup(body) && !content_type.to_ascii_lowercase().contains("json")
}

fn sort_models(mut models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    models.sort_by(|a, b| a.id.cmp(&b.id));
    models.dedup_by(|a, b| a.id == b.id);
    models
}

impl ChatClient {
    /// Models offered by `config`, sorted by id.
    pub async fn fetch_models(
        &self,
        config: &ProviderConfig,
        credentials: &Credentials,
    ) -> Result<Vec<ModelInfo>, CastorError> {
        let access = resolve_access(&self.oauth, config, credentials).await?;
        let Some(call) = prepare_models(config, &access)? else {
            debug!(provider = %config.id, "Using configured model list");
            return Ok(sort_models(
                self.agentic
                    .model_list
                    .iter()
                    .map(|id| ModelInfo {
                        id: id.clone(),
                        name: id.clone(),
                        provider_id: config.id.clone(),
                    })
                    .collect(),
            ));
        };

        let url = call.url.clone();
        info!(provider = %config.id, url = %url, "[Models] Get");
        let resp = self
            .http
            .get(call.url)
            .headers(call.headers)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.bytes().await?;
        let non_json = || {
            let preview = truncate_body(String::from_utf8_lossy(&body).trim());
            warn!(provider = %config.id, url = %url, content_type = %content_type, "[Models] non-JSON response");
            CastorError::NonJsonResponse {
                url: url.to_string(),
                content_type: if content_type.is_empty() {
                    "no content type".to_string()
                } else {
                    content_type.clone()
                },
                preview,
            }
        };

        if looks_like_html(&content_type, &body) {
            return Err(non_json());
        }
        if !status.is_success() {
            return Err(failure_from_body(status, &body));
        }

        match Dialect::for_kind(config.kind).model_list(&body, &config.id) {
            Ok(models) => {
                let models = sort_models(models);
                info!(provider = %config.id, count = models.len(), "[Models] fetched");
                Ok(models)
            }
            Err(_) if starts_with_markup(&body) => Err(non_json()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_detection_honours_content_type() {
        assert!(looks_like_html("text/html; charset=utf-8", b"  <!DOCTYPE html>"));
        assert!(looks_like_html("", b"<html>"));
        assert!(!looks_like_html("application/json", b"<html>"));
        assert!(!looks_like_html("text/html", b"{\"data\":[]}"));
        assert!(starts_with_markup(b"\n<html>"));
    }

    #[test]
    fn models_are_sorted_and_unique() {
        let model = |id: &str| ModelInfo {
            id: id.to_string(),
            name: id.to_string(),
            provider_id: "p".to_string(),
        };
        let sorted = sort_models(vec![model("b"), model("a"), model("b")]);
        let ids: Vec<&str> = sorted.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
