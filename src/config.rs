//! Configuration resolution for omnitool
//!
//! Two-tier resolution with ENV > TOML priority. An optional `omnitool.toml`
//! (path overridable via `OMNITOOL_CONFIG`) supplies base values; individual
//! `OMNITOOL_*` environment variables override single fields. Defaults point
//! at the public upstream endpoints with empty API keys.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Default config file name, looked up in the working directory
const CONFIG_FILE: &str = "omnitool.toml";

/// Resolved service configuration
///
/// Eight upstream fields (base URL + API key per upstream) plus the local
/// bind address. Injected into `AppState` at construction; nothing reads
/// configuration ambiently after startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local listen address for the HTTP server
    pub bind_addr: String,
    /// TCPing (latency probe) API base URL
    pub tcping_url: String,
    /// TCPing API key
    pub tcping_key: String,
    /// IP geolocation API base URL
    pub ipinfo_url: String,
    /// IP geolocation API key
    pub ipinfo_key: String,
    /// Site metadata (TDK) API base URL
    pub sitetdk_url: String,
    /// Site metadata API key
    pub sitetdk_key: String,
    /// Kugou music search API base URL
    pub kugou_url: String,
    /// Kugou API key
    pub kugou_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tcping_url: "https://api.sdbj.top/api/tcping".to_string(),
            tcping_key: String::new(),
            ipinfo_url: "https://api.sdbj.top/api/chunzhenip".to_string(),
            ipinfo_key: String::new(),
            sitetdk_url: "https://api.sdbj.top/api/sitetdk".to_string(),
            sitetdk_key: String::new(),
            kugou_url: "https://api.sdbj.top/api/kugou".to_string(),
            kugou_key: String::new(),
        }
    }
}

impl Config {
    /// Load configuration: TOML file (if present), then ENV overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var("OMNITOOL_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());

        let mut config = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            let parsed: Config = toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file: {}", path))?;
            info!("Configuration loaded from {}", path);
            parsed
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `OMNITOOL_*` environment variable overrides, field by field
    fn apply_env_overrides(&mut self) {
        env_override(&mut self.bind_addr, "OMNITOOL_BIND_ADDR");
        env_override(&mut self.tcping_url, "OMNITOOL_TCPING_URL");
        env_override(&mut self.tcping_key, "OMNITOOL_TCPING_KEY");
        env_override(&mut self.ipinfo_url, "OMNITOOL_IPINFO_URL");
        env_override(&mut self.ipinfo_key, "OMNITOOL_IPINFO_KEY");
        env_override(&mut self.sitetdk_url, "OMNITOOL_SITETDK_URL");
        env_override(&mut self.sitetdk_key, "OMNITOOL_SITETDK_KEY");
        env_override(&mut self.kugou_url, "OMNITOOL_KUGOU_URL");
        env_override(&mut self.kugou_key, "OMNITOOL_KUGOU_KEY");
    }
}

fn env_override(field: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *field = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_endpoints() {
        let config = Config::default();
        assert_eq!(config.tcping_url, "https://api.sdbj.top/api/tcping");
        assert_eq!(config.kugou_url, "https://api.sdbj.top/api/kugou");
        assert!(config.tcping_key.is_empty());
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let config: Config = toml::from_str(
            r#"
            tcping_url = "http://localhost:9000/tcping"
            tcping_key = "secret"
            "#,
        )
        .expect("Should parse partial config");

        assert_eq!(config.tcping_url, "http://localhost:9000/tcping");
        assert_eq!(config.tcping_key, "secret");
        // Untouched fields fall back to defaults
        assert_eq!(config.ipinfo_url, "https://api.sdbj.top/api/chunzhenip");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }
}
