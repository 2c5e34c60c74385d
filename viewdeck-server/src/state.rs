use std::sync::Arc;

use viewdeck_core::rewrite::ContentRewriter;

use crate::config::ServerConfig;
use crate::proxy::UpstreamFetcher;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<UpstreamFetcher>,
    pub rewriter: Arc<ContentRewriter>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: Arc::new(UpstreamFetcher::new(
                &config.user_agent,
                config.upstream_timeout,
            )?),
            rewriter: Arc::new(ContentRewriter::new(config.instrumentation.clone())),
        })
    }
}
