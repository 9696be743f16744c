mod file_config;

pub use file_config::{FileConfig, GithubOauthConfig, RawgConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_API_BASE_URL: &str = "https://api.github.com";
const RAWG_API_URL: &str = "https://api.rawg.io";

/// CLI arguments that participate in config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub rawg_api_key: Option<String>,
    pub token_retention_days: u64,
    pub prune_interval_hours: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub token_retention_days: u64,
    pub prune_interval_hours: u64,

    // Feature configs (with defaults)
    pub rawg: RawgSettings,
    pub github: Option<GithubOauthSettings>,
}

#[derive(Debug, Clone)]
pub struct RawgSettings {
    pub enabled: bool, // true if api_key is set
    pub api_url: String,
    pub api_key: String,
    pub timeout_sec: u64,
    pub cache_max_age_sec: u64,
}

impl Default for RawgSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: RAWG_API_URL.to_string(),
            api_key: String::new(),
            timeout_sec: 30,
            cache_max_age_sec: 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GithubOauthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub app_url: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let token_retention_days = file
            .token_retention_days
            .unwrap_or(cli.token_retention_days);
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);

        // RAWG settings - the pass-through stays disabled without an api key
        let rawg_file = file.rawg.unwrap_or_default();
        let rawg_defaults = RawgSettings::default();
        let api_key = rawg_file
            .api_key
            .or_else(|| cli.rawg_api_key.clone())
            .unwrap_or_default();
        let rawg = RawgSettings {
            enabled: !api_key.is_empty(),
            api_url: rawg_file.api_url.unwrap_or(rawg_defaults.api_url),
            api_key,
            timeout_sec: rawg_file.timeout_sec.unwrap_or(rawg_defaults.timeout_sec),
            cache_max_age_sec: rawg_file
                .cache_max_age_sec
                .unwrap_or(rawg_defaults.cache_max_age_sec),
        };

        // GitHub OAuth is only on when the TOML section provides credentials
        let github = file.github.map(|g| GithubOauthSettings {
            client_id: g.client_id,
            client_secret: g.client_secret,
            redirect_uri: g.redirect_uri,
            app_url: g.app_url.unwrap_or_else(|| "/".to_string()),
            authorize_url: g
                .authorize_url
                .unwrap_or_else(|| GITHUB_AUTHORIZE_URL.to_string()),
            token_url: g.token_url.unwrap_or_else(|| GITHUB_TOKEN_URL.to_string()),
            api_base_url: g
                .api_base_url
                .unwrap_or_else(|| GITHUB_API_BASE_URL.to_string()),
        });

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            token_retention_days,
            prune_interval_hours,
            rawg,
            github,
        })
    }

    pub fn users_db_path(&self) -> PathBuf {
        self.db_dir.join("users.db")
    }

    pub fn content_db_path(&self) -> PathBuf {
        self.db_dir.join("content.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("path"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("BODY"),
            Some(RequestsLoggingLevel::Body)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            content_cache_age_sec: 7200,
            frontend_dir_path: Some("/frontend".to_string()),
            rawg_api_key: Some("rawg-key".to_string()),
            token_retention_days: 60,
            prune_interval_hours: 12,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.content_cache_age_sec, 7200);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.token_retention_days, 60);
        assert_eq!(config.prune_interval_hours, 12);
        assert!(config.rawg.enabled);
        assert_eq!(config.rawg.api_key, "rawg-key");
        assert!(config.github.is_none());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            content_cache_age_sec: 3600,
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.content_cache_age_sec, 3600);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_rawg_disabled_without_key() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            rawg_api_key: None,
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(!config.rawg.enabled);
        assert_eq!(config.rawg.api_url, "https://api.rawg.io");
    }

    #[test]
    fn test_github_section_gets_endpoint_defaults() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let file_config = FileConfig {
            github: Some(GithubOauthConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "https://gamehub.example.com/api/auth/github/callback".to_string(),
                app_url: None,
                authorize_url: None,
                token_url: None,
                api_base_url: None,
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        let github = config.github.unwrap();
        assert_eq!(github.authorize_url, "https://github.com/login/oauth/authorize");
        assert_eq!(github.token_url, "https://github.com/login/oauth/access_token");
        assert_eq!(github.api_base_url, "https://api.github.com");
        assert_eq!(github.app_url, "/");
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.users_db_path(), temp_dir.path().join("users.db"));
        assert_eq!(config.content_db_path(), temp_dir.path().join("content.db"));
    }
}
