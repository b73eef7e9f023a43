//! omnitool library - multi-purpose online query tool
//!
//! Aggregates four upstream HTTP APIs behind one HTML page: a TCPing latency
//! probe, IP geolocation and site TDK metadata for IP/domain queries, and
//! Kugou search for music queries. Stateless; every request is classified,
//! fanned out to the relevant upstreams and rendered independently.

use axum::Router;

pub mod api;
pub mod config;
pub mod error;
pub mod render;
pub mod upstream;

pub use config::Config;
pub use upstream::UpstreamClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Client for all outbound upstream API calls
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Create new application state
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/", get(api::handle_get).post(api::handle_post))
        .merge(api::health_routes())
        .with_state(state)
}
