//! Upstream API clients
//!
//! One thin client over four third-party HTTP APIs:
//! - TCPing latency probe (also yields the resolved IP for a domain)
//! - IP geolocation (opaque text body)
//! - Site metadata / TDK (title, description, keywords)
//! - Kugou music search
//!
//! Failure semantics differ per upstream and are fixed here, not in the
//! handlers: probe and music failures are hard errors; site metadata
//! degrades to `None`; geolocation degrades to an inline failure string.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::UpstreamError;

/// Default timeout for upstream API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// User-Agent header sent to upstreams
const USER_AGENT: &str = concat!("omnitool/", env!("CARGO_PKG_VERSION"));

/// Number of probe repetitions requested from the TCPing API
const PROBE_REPETITIONS: &str = "3";

/// Kugou music search payload
///
/// All fields are optional and untrusted; a response may carry only `msg`
/// (no matches) or a song list whose entries have missing or bogus fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MusicData {
    /// Human-readable status message from the upstream
    pub msg: Option<String>,
    /// Matched songs, absent when the search found nothing
    pub musicarr: Option<Vec<Song>>,
}

/// One entry of the Kugou search result list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Song {
    /// Display name of the song
    pub songname: Option<String>,
    /// Performing artist
    pub singer: Option<String>,
    /// Download URL; may be empty or not a fetchable scheme
    pub mp3: Option<String>,
}

/// Shared client for all four upstream APIs
///
/// Holds one pooled `reqwest::Client`; cheap to clone, no per-request state.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    config: Config,
}

impl UpstreamClient {
    /// Create a client from resolved configuration
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http, config })
    }

    /// Run the TCPing latency probe against `target` (IP or domain)
    ///
    /// Returns the full JSON payload; the resolved IP, when present, sits at
    /// `data.ip`. Any failure here is a hard error for the whole IP query.
    pub async fn probe(&self, target: &str) -> Result<Value, UpstreamError> {
        debug!(target = %target, "Querying TCPing API");

        let response = self
            .http
            .get(&self.config.tcping_url)
            .query(&[
                ("type", "tcping"),
                ("reqnum", PROBE_REPETITIONS),
                ("url", target),
                ("apiKey", &self.config.tcping_key),
            ])
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                api: "TCPing",
                source,
            })?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                api: "TCPing",
                status: response.status(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| UpstreamError::Parse {
                api: "TCPing",
                source,
            })
    }

    /// Fetch site TDK metadata for `target`
    ///
    /// Soft failure path: transport errors, non-2xx statuses and unparseable
    /// bodies all collapse to `None`. The caller never sees an error.
    pub async fn site_metadata(&self, target: &str) -> Option<Value> {
        debug!(target = %target, "Querying site TDK API");

        let response = self
            .http
            .get(&self.config.sitetdk_url)
            .query(&[("url", target), ("apiKey", &self.config.sitetdk_key)])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "Site TDK API returned non-success, omitting section");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Site TDK API unreachable, omitting section");
                return None;
            }
        };

        match response.json().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Site TDK response was not JSON, omitting section");
                None
            }
        }
    }

    /// Look up geolocation text for a resolved IP
    ///
    /// Never fails: a non-success status or transport error is rendered as a
    /// literal failure string inside the results (the overall request still
    /// succeeds with HTTP 200).
    pub async fn geolocate(&self, ip: &str) -> String {
        debug!(ip = %ip, "Querying IP geolocation API");

        let response = self
            .http
            .get(&self.config.ipinfo_url)
            .query(&[("ip", ip), ("apiKey", &self.config.ipinfo_key)])
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => r.text().await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read geolocation body");
                format!("查询失败: {}", e)
            }),
            Ok(r) => {
                warn!(status = %r.status(), "Geolocation API returned non-success");
                format!("查询失败: {}", r.status().as_u16())
            }
            Err(e) => {
                warn!(error = %e, "Geolocation API unreachable");
                format!("查询失败: {}", e)
            }
        }
    }

    /// Search Kugou for a song by name
    ///
    /// The song name is URL-encoded by the query builder. Any failure here is
    /// a hard error for the music query.
    pub async fn search_music(&self, song: &str) -> Result<MusicData, UpstreamError> {
        debug!(song = %song, "Querying Kugou music API");

        let response = self
            .http
            .get(&self.config.kugou_url)
            .query(&[("apiKey", self.config.kugou_key.as_str()), ("msg", song)])
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                api: "Kugou",
                source,
            })?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                api: "Kugou",
                status: response.status(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| UpstreamError::Parse {
                api: "Kugou",
                source,
            })
    }
}

/// Extract the resolved IP from a TCPing payload (`data.ip`), if present
pub fn resolved_ip(tcping: &Value) -> Option<&str> {
    tcping.pointer("/data/ip").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolved_ip_reads_data_ip_path() {
        let payload = json!({"code": 200, "data": {"ip": "93.184.216.34", "avg": 12}});
        assert_eq!(resolved_ip(&payload), Some("93.184.216.34"));
    }

    #[test]
    fn resolved_ip_absent_when_no_ip_field() {
        assert_eq!(resolved_ip(&json!({"code": 200, "data": {"avg": 12}})), None);
        assert_eq!(resolved_ip(&json!({"code": 500})), None);
        // Non-string ip is treated as absent
        assert_eq!(resolved_ip(&json!({"data": {"ip": 42}})), None);
    }

    #[test]
    fn music_payload_tolerates_missing_fields() {
        let data: MusicData = serde_json::from_value(json!({"msg": "none"}))
            .expect("Should parse message-only payload");
        assert_eq!(data.msg.as_deref(), Some("none"));
        assert!(data.musicarr.is_none());

        let data: MusicData = serde_json::from_value(json!({
            "msg": "ok",
            "musicarr": [{"songname": "A"}, {}]
        }))
        .expect("Should parse sparse song entries");
        let songs = data.musicarr.expect("Should have song list");
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].songname.as_deref(), Some("A"));
        assert!(songs[1].singer.is_none());
    }
}
