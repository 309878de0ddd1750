use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Remote screener service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Site root; the processing endpoint is `<base_url>/screener/process`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between two screeners of the same run.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Extra attempts for the landing-page GET.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Snapshot storage locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// One `<YYYY_MM_DD>.duckdb` per day lives here.
    #[serde(default = "default_daily_dir")]
    pub daily_dir: PathBuf,

    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://chartink.com".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    1
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}
fn default_daily_dir() -> PathBuf {
    PathBuf::from("data/daily_dbs")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("data/screener_index.duckdb")
}
fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            daily_dir: default_daily_dir(),
            index_path: default_index_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SCREENER").separator("__"))
            .build()?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[scraper]\ntimeout_secs = 3\n\n[storage]\ndaily_dir = \"/tmp/days\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.scraper.timeout_secs, 3);
        assert_eq!(cfg.scraper.base_url, "https://chartink.com");
        assert_eq!(cfg.storage.daily_dir, PathBuf::from("/tmp/days"));
        assert_eq!(cfg.storage.index_path, default_index_path());
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
    }
}
