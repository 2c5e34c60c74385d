//! Store and assist configuration from environment variables.
//!
//!   VIEWDECK_STORE_URL           — realtime-database base URL (sharing disabled when unset)
//!   VIEWDECK_STORE_AUTH          — auth token appended as `?auth=`
//!   VIEWDECK_STORE_POLL_MS       — subscription poll interval (default: 1000)
//!   VIEWDECK_ASSIST_URL          — base URL of the assist service
//!   VIEWDECK_ASSIST_TIMEOUT_SECS — per-call timeout (default: 60)

use std::sync::Arc;
use std::time::Duration;

use crate::store::SessionStore;
use crate::store_rest::{RestSessionStore, DEFAULT_POLL_INTERVAL};

const HOSTED_DB_MARKERS: &[&str] = &["firebaseio.com", "firebasedatabase.app"];
const PLACEHOLDER_MARKERS: &[&str] = &["your-", "your_", "<", "changeme", "replace"];

pub const DEFAULT_ASSIST_TIMEOUT: Duration = Duration::from_secs(60);

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    value.trim().is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Normalize a store URL to `scheme://host[:port]`. Hosted realtime-database
/// hosts get `https://` when the scheme is missing. `None` for empty,
/// placeholder or unparseable values.
pub fn sanitize_store_url(raw: &str) -> Option<String> {
    if is_placeholder(raw) {
        return None;
    }
    let mut candidate = raw.trim().to_string();
    if HOSTED_DB_MARKERS.iter().any(|m| candidate.contains(m)) && !candidate.starts_with("http") {
        candidate = format!("https://{candidate}");
    }
    match url::Url::parse(&candidate) {
        Ok(parsed) => {
            let host = parsed.host_str()?;
            match parsed.port() {
                Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
                None => Some(format!("{}://{}", parsed.scheme(), host)),
            }
        }
        Err(e) => {
            tracing::warn!("Could not parse store URL {:?}: {}", raw, e);
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub url: String,
    pub auth: Option<String>,
    pub poll_interval: Duration,
}

impl StoreConfig {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("VIEWDECK_STORE_URL").and_then(|raw| sanitize_store_url(&raw));
        let Some(url) = url else {
            tracing::warn!(
                "Session store configuration is incomplete; sharing is disabled"
            );
            return None;
        };
        let poll_interval = lookup("VIEWDECK_STORE_POLL_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        Some(Self {
            url,
            auth: lookup("VIEWDECK_STORE_AUTH").filter(|a| !is_placeholder(a)),
            poll_interval,
        })
    }

    pub fn open(&self) -> anyhow::Result<Arc<dyn SessionStore>> {
        let store = RestSessionStore::new(&self.url, self.auth.clone())?
            .with_poll_interval(self.poll_interval);
        tracing::info!("Session store at {}", self.url);
        Ok(Arc::new(store))
    }
}

/// Open the configured store, if any. A store that fails to initialize is
/// treated like a missing one.
pub fn open_store(config: Option<&StoreConfig>) -> Option<Arc<dyn SessionStore>> {
    let config = config?;
    match config.open() {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!("Session store initialization failed: {:#}", e);
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl AssistConfig {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("VIEWDECK_ASSIST_URL").filter(|u| !is_placeholder(u))?;
        let timeout = lookup("VIEWDECK_ASSIST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ASSIST_TIMEOUT);
        Some(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_sanitize_adds_scheme_and_strips_path() {
        assert_eq!(
            sanitize_store_url("demo-default-rtdb.firebaseio.com/some/path").as_deref(),
            Some("https://demo-default-rtdb.firebaseio.com")
        );
        assert_eq!(
            sanitize_store_url(" https://demo.europe-west1.firebasedatabase.app/x ").as_deref(),
            Some("https://demo.europe-west1.firebasedatabase.app")
        );
        assert_eq!(
            sanitize_store_url("http://127.0.0.1:9000/").as_deref(),
            Some("http://127.0.0.1:9000")
        );
    }

    #[test]
    fn test_placeholders_disable_store() {
        assert_eq!(sanitize_store_url(""), None);
        assert_eq!(sanitize_store_url("https://your-project.firebaseio.com"), None);
        assert_eq!(sanitize_store_url("<database-url>"), None);
        assert_eq!(sanitize_store_url("not a url"), None);
    }

    #[test]
    fn test_store_config_from_lookup() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("VIEWDECK_STORE_URL", "demo.firebaseio.com"),
            ("VIEWDECK_STORE_POLL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://demo.firebaseio.com");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.auth, None);

        assert!(StoreConfig::from_lookup(lookup(&[])).is_none());
        assert!(open_store(None).is_none());
    }

    #[test]
    fn test_assist_config_defaults() {
        let config =
            AssistConfig::from_lookup(lookup(&[("VIEWDECK_ASSIST_URL", "http://assist:4000/")]))
                .unwrap();
        assert_eq!(config.base_url, "http://assist:4000");
        assert_eq!(config.timeout, DEFAULT_ASSIST_TIMEOUT);
        assert!(AssistConfig::from_lookup(lookup(&[])).is_none());
    }
}
