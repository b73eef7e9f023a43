//! Error types for omnitool

use thiserror::Error;

/// Failure of an outbound upstream API call
///
/// Only the probe (TCPing) and music (Kugou) upstreams surface these to the
/// user; site-metadata failures degrade to `None` and geolocation failures
/// become an inline text string before reaching the renderer.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("{api} API request failed: {source}")]
    Transport {
        /// Upstream name as shown to the user
        api: &'static str,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success HTTP status
    #[error("{api} API error: {status}")]
    Status {
        /// Upstream name as shown to the user
        api: &'static str,
        /// HTTP status returned by the upstream
        status: reqwest::StatusCode,
    },

    /// Upstream body was not the expected JSON shape
    #[error("{api} API returned an unparseable response: {source}")]
    Parse {
        /// Upstream name as shown to the user
        api: &'static str,
        /// Underlying reqwest/serde error
        #[source]
        source: reqwest::Error,
    },
}
