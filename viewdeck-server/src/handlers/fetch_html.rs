//! GET /fetch-html?url= — raw upstream HTML, no rewriting.
//!
//! Used to hand pages the assist service cannot reach (local dev servers)
//! over as text.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::{caller_user_agent, target_url};
use crate::error::ProxyError;
use crate::proxy::{outbound_headers, status_text};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchHtmlParams {
    pub url: Option<String>,
}

pub async fn fetch_html(
    State(state): State<AppState>,
    Query(params): Query<FetchHtmlParams>,
    request_headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let url = target_url(params.url.as_deref())?;

    let upstream = state
        .fetcher
        .fetch(&url, caller_user_agent(&request_headers))
        .await?;

    if !upstream.status.is_success() {
        let body = String::from_utf8_lossy(&upstream.body).into_owned();
        return Err(ProxyError::UpstreamStatus {
            status: upstream.status.as_u16(),
            message: if body.is_empty() {
                status_text(upstream.status)
            } else {
                body
            },
        });
    }

    let mut headers = outbound_headers(&upstream.headers);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

    let mut response = Body::from(upstream.body).into_response();
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    Ok(response)
}
