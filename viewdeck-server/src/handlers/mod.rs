pub mod fetch_html;
pub mod health;
pub mod proxy;

use axum::http::{header::USER_AGENT, HeaderMap};
use viewdeck_core::rewrite::normalize_target_url;

use crate::error::ProxyError;

/// Required, scheme-normalized target from the `url` query parameter.
fn target_url(raw: Option<&str>) -> Result<String, ProxyError> {
    match raw.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(normalize_target_url(url)),
        _ => Err(ProxyError::MissingUrl),
    }
}

fn caller_user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
}
