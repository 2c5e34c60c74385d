//! Server configuration.
//!
//!   VIEWDECK_BIND_ADDR             — listen address (default: 0.0.0.0:3000)
//!   VIEWDECK_USER_AGENT            — identity for upstream fetches when the client sends none
//!   VIEWDECK_SETTLE_DELAY_MS       — delay before the first navigation report (default: 100)
//!   VIEWDECK_INSPECTOR             — inject the in-page inspector (default: on)
//!   VIEWDECK_UPSTREAM_TIMEOUT_SECS — upstream fetch timeout (default: 30)

use std::time::Duration;

use viewdeck_core::navigation::{Instrumentation, DEFAULT_SETTLE_DELAY_MS};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub user_agent: String,
    pub instrumentation: Instrumentation,
    pub upstream_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            instrumentation: Instrumentation::default(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let settle_delay_ms = lookup("VIEWDECK_SETTLE_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SETTLE_DELAY_MS);
        let inspector = lookup("VIEWDECK_INSPECTOR")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);

        Self {
            bind_addr: lookup("VIEWDECK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            user_agent: lookup("VIEWDECK_USER_AGENT")
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or_else(|| DESKTOP_USER_AGENT.into()),
            instrumentation: Instrumentation {
                settle_delay_ms,
                inspector,
            },
            upstream_timeout: lookup("VIEWDECK_UPSTREAM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
        }
    }
}
