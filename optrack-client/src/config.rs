use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the entry service, including the `/api` path
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory for drafts, session state, and exports
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between draft snapshots while the entry form is active
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// How long a fetched statistics bundle stays fresh
    #[serde(default = "default_stats_cache_secs")]
    pub stats_cache_secs: u64,

    #[serde(default = "default_suggest_debounce_ms")]
    pub suggest_debounce_ms: u64,

    /// Autocomplete queries shorter than this are not sent
    #[serde(default = "default_suggest_min_chars")]
    pub suggest_min_chars: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_autosave_interval_secs() -> u64 {
    15
}

fn default_stats_cache_secs() -> u64 {
    60
}

fn default_suggest_debounce_ms() -> u64 {
    300
}

fn default_suggest_min_chars() -> usize {
    2
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            autosave_interval_secs: default_autosave_interval_secs(),
            stats_cache_secs: default_stats_cache_secs(),
            suggest_debounce_ms: default_suggest_debounce_ms(),
            suggest_min_chars: default_suggest_min_chars(),
        }
    }
}

pub static CONFIG: OnceLock<ClientConfig> = OnceLock::new();

/// Load `config.toml` from the working directory into [`CONFIG`]. A missing
/// file falls back to defaults; a malformed file is an error.
pub fn read_config() -> anyhow::Result<()> {
    let path = "config.toml";
    let config = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("No {path} found, using default configuration");
            ClientConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("configuration already initialized"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ClientConfig =
            toml::from_str("api_base_url = \"http://tracker.test/api\"").unwrap();
        assert_eq!(config.api_base_url, "http://tracker.test/api");
        assert_eq!(config.autosave_interval_secs, 15);
        assert_eq!(config.stats_cache_secs, 60);
        assert_eq!(config.suggest_min_chars, 2);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5000/api");
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.log_level, "info");
    }
}
