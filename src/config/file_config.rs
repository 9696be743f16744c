use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub content_cache_age_sec: Option<usize>,
    pub frontend_dir_path: Option<String>,
    pub token_retention_days: Option<u64>,
    pub prune_interval_hours: Option<u64>,

    // Feature configs
    pub rawg: Option<RawgConfig>,
    pub github: Option<GithubOauthConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RawgConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_sec: Option<u64>,
    pub cache_max_age_sec: Option<u64>,
}

/// GitHub OAuth requires explicit credentials; the remaining endpoints have
/// production defaults and exist so tests can point the flow at a stub.
#[derive(Debug, Deserialize, Clone)]
pub struct GithubOauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub app_url: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
