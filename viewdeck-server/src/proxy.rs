//! Upstream fetching for the proxy routes.
//!
//! One GET per request, never retried. Transport failures are classified
//! into connection-refused (actionable, names the target) and everything
//! else (carries the underlying cause code).

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use reqwest::Client;

use viewdeck_core::rewrite::is_framing_header;

use crate::error::ProxyError;

/// Headers owned by the transport, dropped when re-emitting a response.
const TRANSPORT_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "content-length",
];

/// What came back from upstream, already converted to the server's types.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

pub struct UpstreamFetcher {
    client: Client,
    default_user_agent: String,
}

impl UpstreamFetcher {
    pub fn new(default_user_agent: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            client,
            default_user_agent: default_user_agent.into(),
        })
    }

    /// Fetch `url`, forwarding the caller's user agent when it sent one.
    /// Non-success statuses are returned, not raised; callers decide how to
    /// word them.
    pub async fn fetch(
        &self,
        url: &str,
        user_agent: Option<&str>,
    ) -> Result<UpstreamResponse, ProxyError> {
        let agent = user_agent
            .filter(|ua| !ua.is_empty())
            .unwrap_or(&self.default_user_agent);

        tracing::debug!("Fetching upstream {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, agent)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        let headers = convert_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, &e))?
            .to_vec();

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Reason phrase for a status, the way fetch exposes `statusText`.
pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

fn convert_headers(upstream: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) else {
            continue;
        };
        headers.append(name, value);
    }
    headers
}

/// Upstream headers as re-emitted by the proxy: framing restrictions and
/// transport headers removed, everything else untouched.
pub fn outbound_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        let lower = name.as_str();
        if is_framing_header(lower) || TRANSPORT_HEADERS.contains(&lower) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn classify_transport_error(url: &str, err: &reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        return ProxyError::Network {
            code: "TimedOut".to_string(),
        };
    }
    match io_error_kind(err) {
        Some(io::ErrorKind::ConnectionRefused) => ProxyError::ConnectionRefused {
            url: url.to_string(),
        },
        Some(kind) => ProxyError::Network {
            code: format!("{kind:?}"),
        },
        None => ProxyError::Network {
            code: err.to_string(),
        },
    }
}

/// First `io::Error` kind anywhere in the source chain.
pub fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = e.source();
    }
    None
}
