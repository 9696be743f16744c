use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gamehub_server::config::{AppConfig, CliConfig, FileConfig};
use gamehub_server::content::SqliteContentStore;
use gamehub_server::github::GithubOauthClient;
use gamehub_server::rawg::RawgClient;
use gamehub_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use gamehub_server::user::{SqliteUserStore, UserTokenStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the sqlite database files (users.db, content.db).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to an optional TOML config file. TOML values override CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Cache-Control max-age for RAWG pass-through responses, in seconds.
    #[clap(long, default_value_t = 3600)]
    pub content_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// RAWG API key. The external game listing stays disabled without it.
    #[clap(long)]
    pub rawg_api_key: Option<String>,

    /// Number of days to retain unused session tokens before pruning.
    /// Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub token_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if token_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        content_cache_age_sec: cli_args.content_cache_age_sec,
        frontend_dir_path: cli_args.frontend_dir_path,
        rawg_api_key: cli_args.rawg_api_key,
        token_retention_days: cli_args.token_retention_days,
        prune_interval_hours: cli_args.prune_interval_hours,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening user database at {:?}...", config.users_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.users_db_path())?);

    info!(
        "Opening content database at {:?}...",
        config.content_db_path()
    );
    let content_store = Arc::new(SqliteContentStore::new(config.content_db_path())?);

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    // Spawn background task for session token pruning if enabled
    if config.token_retention_days > 0 {
        let retention_days = config.token_retention_days;
        let interval_hours = config.prune_interval_hours;
        let pruning_user_store = user_store.clone();

        info!(
            "Session token pruning enabled: retaining {} days, pruning every {} hours",
            retention_days, interval_hours
        );

        tokio::spawn(async move {
            let interval = Duration::from_secs(interval_hours * 60 * 60);
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match pruning_user_store.prune_unused_tokens(retention_days) {
                    Ok(count) => {
                        if count > 0 {
                            info!("Pruned {} unused session tokens", count);
                        }
                    }
                    Err(e) => {
                        error!("Failed to prune session tokens: {}", e);
                    }
                }
            }
        });
    }

    let rawg = if config.rawg.enabled {
        info!("RAWG pass-through enabled at {}", config.rawg.api_url);
        Some(Arc::new(RawgClient::new(
            config.rawg.api_url.clone(),
            config.rawg.api_key.clone(),
            config.rawg.timeout_sec,
            config.rawg.cache_max_age_sec,
        )?))
    } else {
        info!("No RAWG api key configured, the external game listing is disabled");
        None
    };

    let github_oauth = config
        .github
        .clone()
        .map(|settings| Arc::new(GithubOauthClient::new(settings)));
    if github_oauth.is_none() {
        info!("No GitHub OAuth credentials configured, OAuth login is disabled");
    }

    let server_config = ServerConfig {
        port: config.port,
        requests_logging_level: config.logging_level.clone(),
        content_cache_age_sec: config.content_cache_age_sec,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(
        server_config,
        config.metrics_port,
        user_store,
        content_store,
        rawg,
        github_oauth,
    )
    .await
}
