//! viewdeck-server — content proxy for multi-viewport previews.
//!
//! Reads config from env vars (a `.env` file is loaded first):
//!   VIEWDECK_BIND_ADDR             — listen address (default: 0.0.0.0:3000)
//!   VIEWDECK_USER_AGENT            — fallback upstream user agent
//!   VIEWDECK_SETTLE_DELAY_MS       — first navigation report delay (default: 100)
//!   VIEWDECK_INSPECTOR             — inject the in-page inspector (default: on)
//!   VIEWDECK_UPSTREAM_TIMEOUT_SECS — upstream timeout (default: 30)

use tokio::net::TcpListener;
use viewdeck_server::config::ServerConfig;
use viewdeck_server::router::build_router;
use viewdeck_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,viewdeck_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        "Instrumentation: settle delay {}ms, inspector {}",
        config.instrumentation.settle_delay_ms,
        if config.instrumentation.inspector { "on" } else { "off" }
    );

    let state = AppState::from_config(&config).expect("failed to build upstream client");
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {}: {e}", config.bind_addr));
    tracing::info!("viewdeck-server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
