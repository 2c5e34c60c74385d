//! Textual HTML rewriting for embedded pages.
//!
//! Two literal-tag insertions, no DOM parse: a `<base>` tag so relative
//! resources resolve against the real origin, and the navigation reporter
//! before the closing body tag.
//!
//! Insertion works on raw bytes. Both markers are ASCII, so the document's
//! own encoding passes through untouched whatever its charset.

use url::Url;

use crate::navigation::Instrumentation;

const HEAD_OPEN: &[u8] = b"<head>";
const BODY_CLOSE: &[u8] = b"</body>";

/// Response headers that stop a page from being framed.
pub const FRAMING_HEADERS: &[&str] = &["content-security-policy", "x-frame-options"];

const LOCAL_HOST_MARKERS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

pub fn is_framing_header(name: &str) -> bool {
    FRAMING_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Whether a target's host is the user's own machine. A scheme-less target
/// is read as `http://{target}`.
pub fn is_local_target(url: &str) -> bool {
    let trimmed = url.trim();
    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{trimmed}"))
    };
    let Ok(parsed) = parsed else {
        return false;
    };
    match parsed.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            LOCAL_HOST_MARKERS.contains(&host.as_str()) || host.ends_with(".localhost")
        }
        None => false,
    }
}

/// Add a scheme when the caller left it off: `http` for local targets,
/// `https` for everything else.
pub fn normalize_target_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return trimmed.to_string();
    }
    if is_local_target(trimmed) {
        format!("http://{trimmed}")
    } else {
        format!("https://{trimmed}")
    }
}

pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Rewrites one fetched document. Run exactly once per proxied fetch.
#[derive(Clone, Debug, Default)]
pub struct ContentRewriter {
    pub instrumentation: Instrumentation,
}

impl ContentRewriter {
    pub fn new(instrumentation: Instrumentation) -> Self {
        Self { instrumentation }
    }

    pub fn rewrite(&self, html: &[u8], target_url: &str, panel_id: &str) -> Vec<u8> {
        let with_base = insert_base_tag(html, target_url);
        insert_before_body_close(&with_base, self.instrumentation.script_block(panel_id).as_bytes())
    }
}

pub fn base_tag(target_url: &str) -> String {
    format!("<base href=\"{}\">", escape_attr(target_url))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn splice(html: &[u8], at: usize, insert: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(html.len() + insert.len());
    out.extend_from_slice(&html[..at]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&html[at..]);
    out
}

fn insert_base_tag(html: &[u8], target_url: &str) -> Vec<u8> {
    let tag = base_tag(target_url);
    match find(html, HEAD_OPEN) {
        Some(idx) => splice(html, idx + HEAD_OPEN.len(), tag.as_bytes()),
        None => splice(html, 0, tag.as_bytes()),
    }
}

// Last occurrence: an earlier `</body>` may sit inside an inline script string.
fn insert_before_body_close(html: &[u8], block: &[u8]) -> Vec<u8> {
    match rfind(html, BODY_CLOSE) {
        Some(idx) => splice(html, idx, block),
        None => splice(html, html.len(), block),
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
