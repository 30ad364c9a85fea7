use serde::Serialize;

/// Upstream bodies are cut to this many characters before they reach logs or errors.
pub(crate) const BODY_PREVIEW_CHARS: usize = 300;

pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}

/// First [`BODY_PREVIEW_CHARS`] characters of `body`, marked when cut.
pub(crate) fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...<truncated>", &body[..idx]),
        None => body.to_string(),
    }
}
