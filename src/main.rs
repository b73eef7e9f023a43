//! omnitool - multi-purpose online query tool
//!
//! Serves one HTML page that answers two kinds of user queries:
//! IP/domain diagnostics (latency probe + geolocation + site metadata)
//! and music search. All data comes from upstream HTTP APIs; nothing is
//! stored between requests.

use anyhow::{Context, Result};
use tracing::info;

use omnitool::{build_router, AppState, Config, UpstreamClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting omnitool v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = Config::load().context("Failed to load configuration")?;
    let bind_addr = config.bind_addr.clone();

    let upstream = UpstreamClient::new(config).context("Failed to initialize HTTP client")?;
    let state = AppState::new(upstream);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("omnitool listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
