//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases.

use super::constants::*;
use super::fixtures::create_test_databases;
use gamehub_server::config::GithubOauthSettings;
use gamehub_server::content::{ContentStore, SqliteContentStore};
use gamehub_server::github::GithubOauthClient;
use gamehub_server::rawg::RawgClient;
use gamehub_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use gamehub_server::user::{FullUserStore, SqliteUserStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Cache max age used by test servers with a RAWG stub, in seconds. Long on
/// purpose: entries must not expire mid-test.
const TEST_RAWG_CACHE_AGE_SEC: u64 = 3600;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// User store for direct database access in tests
    pub user_store: Arc<dyn FullUserStore>,

    /// Content store for direct database access in tests
    pub content_store: Arc<dyn ContentStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port, with the RAWG pass-through
    /// and GitHub login disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with(None, None).await
    }

    /// Spawns a test server whose RAWG client points at the given stub.
    pub async fn spawn_with_rawg(rawg_stub_base_url: &str) -> Self {
        let rawg = Arc::new(
            RawgClient::new(
                rawg_stub_base_url.to_string(),
                "test-key".to_string(),
                5,
                TEST_RAWG_CACHE_AGE_SEC,
            )
            .expect("Failed to create RAWG client"),
        );
        Self::spawn_with(Some(rawg), None).await
    }

    /// Spawns a test server whose GitHub OAuth endpoints point at the given
    /// stub.
    pub async fn spawn_with_github(github_stub_base_url: &str) -> Self {
        let settings = GithubOauthSettings {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://127.0.0.1/api/auth/github/callback".to_string(),
            app_url: "/".to_string(),
            authorize_url: format!("{}/login/oauth/authorize", github_stub_base_url),
            token_url: format!("{}/login/oauth/access_token", github_stub_base_url),
            api_base_url: github_stub_base_url.to_string(),
        };
        Self::spawn_with(None, Some(Arc::new(GithubOauthClient::new(settings)))).await
    }

    async fn spawn_with(
        rawg: Option<Arc<RawgClient>>,
        github: Option<Arc<GithubOauthClient>>,
    ) -> Self {
        let (temp_db_dir, users_db_path, content_db_path) =
            create_test_databases().expect("Failed to create test databases");

        let user_store: Arc<dyn FullUserStore> =
            Arc::new(SqliteUserStore::new(&users_db_path).expect("Failed to open user store"));
        let content_store: Arc<dyn ContentStore> = Arc::new(
            SqliteContentStore::new(&content_db_path).expect("Failed to open content store"),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            content_cache_age_sec: 0, // No client-side caching in tests
            frontend_dir_path: None,
        };

        let app = make_app(
            config,
            user_store.clone(),
            content_store.clone(),
            rawg,
            github,
        )
        .await
        .expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            user_store,
            content_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
