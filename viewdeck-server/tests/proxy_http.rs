//! HTTP-level tests for the proxy routes.
//!
//! Requests go through the real router with `oneshot`; upstreams are axum
//! servers bound on 127.0.0.1:0.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tower::ServiceExt;

use viewdeck_core::navigation::{Instrumentation, INSPECTOR_SCRIPT_SRC, INSTRUMENTATION_MARKER};
use viewdeck_server::config::ServerConfig;
use viewdeck_server::router::build_router;
use viewdeck_server::state::AppState;

const PAGE: &str = "<html><head><title>t</title></head><body><a href=\"/about\">about</a></body></html>";
const PLAIN: &str = "plain text\n  with </body> and <head> inside";
// "<p>café</p>" in ISO-8859-1.
const LATIN1_PAGE: &[u8] = b"<html><head></head><body><p>caf\xe9</p></body></html>";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

fn framing_headers(content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("frame-ancestors 'none'"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-upstream", HeaderValue::from_static("kept"));
    headers
}

async fn spawn_upstream() -> String {
    let app = Router::new()
        .route(
            "/page",
            get(|| async { (framing_headers("text/html; charset=utf-8"), PAGE) }),
        )
        .route(
            "/fragment",
            get(|| async { (framing_headers("text/html"), "<p>no head or body</p>") }),
        )
        .route(
            "/plain",
            get(|| async { (framing_headers("text/plain"), PLAIN) }),
        )
        .route(
            "/latin1",
            get(|| async { (framing_headers("text/html; charset=iso-8859-1"), LATIN1_PAGE.to_vec()) }),
        )
        .route(
            "/image",
            get(|| async { (framing_headers("image/png"), PNG.to_vec()) }),
        )
        .route(
            "/ua",
            get(|headers: HeaderMap| async move {
                let ua = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                ([(header::CONTENT_TYPE, "text/plain")], ua)
            }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "no such page").into_response() }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn app() -> Router {
    let config = ServerConfig {
        instrumentation: Instrumentation {
            settle_delay_ms: 100,
            inspector: true,
        },
        ..ServerConfig::default()
    };
    build_router(AppState::from_config(&config).unwrap())
}

fn encode(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('&', "%26")
}

async fn get_path(path: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn assert_no_framing_headers(headers: &HeaderMap) {
    assert!(headers.get("content-security-policy").is_none());
    assert!(headers.get("x-frame-options").is_none());
}

#[tokio::test]
async fn test_html_is_rewritten_once() {
    let upstream = spawn_upstream().await;
    let target = format!("{upstream}/page");
    let (status, headers, body) =
        get_path(&format!("/proxy?url={}&panelId=panel-a", encode(&target))).await;

    assert_eq!(status, StatusCode::OK);
    assert_no_framing_headers(&headers);
    assert_eq!(headers.get("x-upstream").unwrap(), "kept");

    let html = String::from_utf8(body).unwrap();
    assert_eq!(html.matches("<base ").count(), 1);
    assert!(html.starts_with(&format!("<html><head><base href=\"{target}\"><title>")));
    assert_eq!(html.matches(INSTRUMENTATION_MARKER).count(), 1);
    assert!(html.contains("var panelId = \"panel-a\";"));
    assert!(html.contains(INSPECTOR_SCRIPT_SRC));
    assert!(html.ends_with("</script></body></html>"));
}

#[tokio::test]
async fn test_html_without_tags_is_prepended_and_appended() {
    let upstream = spawn_upstream().await;
    let (status, _, body) =
        get_path(&format!("/proxy?url={}&panelId=p", encode(&format!("{upstream}/fragment")))).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.starts_with("<base href="));
    assert!(html.contains("<p>no head or body</p><script"));
}

#[tokio::test]
async fn test_legacy_charset_bytes_are_preserved() {
    let upstream = spawn_upstream().await;
    let (status, headers, body) =
        get_path(&format!("/proxy?url={}&panelId=p", encode(&format!("{upstream}/latin1")))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "text/html; charset=iso-8859-1"
    );
    assert!(body.windows(5).any(|w| w == b"caf\xe9<"));
    assert!(String::from_utf8(body.clone()).is_err());
    assert!(body.ends_with(b"</script></body></html>"));
}

#[tokio::test]
async fn test_plain_text_is_byte_identical() {
    let upstream = spawn_upstream().await;
    let (status, headers, body) =
        get_path(&format!("/proxy?url={}&panelId=p", encode(&format!("{upstream}/plain")))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PLAIN.as_bytes());
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    assert_eq!(headers.get("x-upstream").unwrap(), "kept");
    assert_no_framing_headers(&headers);
}

#[tokio::test]
async fn test_binary_passthrough() {
    let upstream = spawn_upstream().await;
    let (status, headers, body) =
        get_path(&format!("/proxy?url={}", encode(&format!("{upstream}/image")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG);
    assert_no_framing_headers(&headers);
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let (status, _, body) = get_path("/proxy?panelId=p").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"URL parameter is required");

    let (status, _, _) = get_path("/fetch-html?url=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_status_is_propagated() {
    let upstream = spawn_upstream().await;
    let target = encode(&format!("{upstream}/missing"));

    let (status, _, body) = get_path(&format!("/proxy?url={target}&panelId=p")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(String::from_utf8(body).unwrap(), "Failed to fetch URL: Not Found");

    let (status, _, body) = get_path(&format!("/fetch-html?url={target}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(String::from_utf8(body).unwrap(), "Failed to fetch URL: no such page");
}

#[tokio::test]
async fn test_connection_refused_names_target() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (status, _, body) = get_path(&format!("/fetch-html?url=127.0.0.1%3A{port}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        format!(
            "Connection refused at http://127.0.0.1:{port}. Please ensure your local server is running and accessible."
        )
    );
}

#[tokio::test]
async fn test_fetch_html_returns_raw_page() {
    let upstream = spawn_upstream().await;
    let (status, headers, body) =
        get_path(&format!("/fetch-html?url={}", encode(&format!("{upstream}/page")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PAGE.as_bytes());
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/html");
}

#[tokio::test]
async fn test_desktop_identity_used_when_caller_sends_none() {
    let upstream = spawn_upstream().await;
    let target = encode(&format!("{upstream}/ua"));

    let (_, _, body) = get_path(&format!("/proxy?url={target}")).await;
    assert!(String::from_utf8(body).unwrap().contains("Chrome/91.0.4472.124"));

    let response = app()
        .oneshot(
            Request::builder()
                .uri(format!("/proxy?url={target}"))
                .header(header::USER_AGENT, "custom-agent/1.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"custom-agent/1.0");
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = get_path("/health").await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "ok");
}
