use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Proxy failures. Every variant renders as a plain-text body.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("URL parameter is required")]
    MissingUrl,

    /// Upstream answered with a non-success status; it is propagated as-is.
    #[error("Failed to fetch URL: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Connection refused at {url}. Please ensure your local server is running and accessible.")]
    ConnectionRefused { url: String },

    #[error("A network error occurred: {code}")]
    Network { code: String },

    #[error("Proxy error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::ConnectionRefused { .. }
            | ProxyError::Network { .. }
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::MissingUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::UpstreamStatus {
                status: 404,
                message: "Not Found".into()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::Network { code: "TimedOut".into() }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ProxyError::ConnectionRefused {
                url: "http://localhost:3000".into()
            }
            .to_string(),
            "Connection refused at http://localhost:3000. Please ensure your local server is running and accessible."
        );
        assert_eq!(
            ProxyError::UpstreamStatus {
                status: 503,
                message: "Service Unavailable".into()
            }
            .to_string(),
            "Failed to fetch URL: Service Unavailable"
        );
    }
}
