//! GET /proxy?url=&panelId= — fetch a page and prepare it for embedding.
//!
//! HTML gets a base tag and the navigation reporter; anything else passes
//! through byte-for-byte. Framing-restriction headers are removed from every
//! response.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use viewdeck_core::rewrite::is_html_content_type;

use super::{caller_user_agent, target_url};
use crate::error::ProxyError;
use crate::proxy::{outbound_headers, status_text};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
    #[serde(rename = "panelId", alias = "previewId")]
    pub panel_id: Option<String>,
}

pub async fn proxy(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    request_headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let url = target_url(params.url.as_deref())?;
    let panel_id = params.panel_id.unwrap_or_default();

    let upstream = state
        .fetcher
        .fetch(&url, caller_user_agent(&request_headers))
        .await?;

    if !upstream.status.is_success() {
        return Err(ProxyError::UpstreamStatus {
            status: upstream.status.as_u16(),
            message: status_text(upstream.status),
        });
    }

    let headers = outbound_headers(&upstream.headers);

    if !is_html_content_type(upstream.content_type()) {
        tracing::debug!("Passing through non-HTML response from {}", url);
        let mut response = Body::from(upstream.body).into_response();
        *response.status_mut() = upstream.status;
        *response.headers_mut() = headers;
        return Ok(response);
    }

    if panel_id.is_empty() {
        tracing::debug!("Proxying {} without a panel id; reports will be ignored", url);
    }
    let rewritten = state.rewriter.rewrite(&upstream.body, &url, &panel_id);
    tracing::info!("Rewrote {} for panel {:?}", url, panel_id);

    let mut response = Body::from(rewritten).into_response();
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    Ok(response)
}
