//! GitHub OAuth2 login flow.
//!
//! This module handles the authorization-code flow against GitHub:
//! - Authorization URL generation with PKCE
//! - CSRF state management between /github and /github/callback
//! - Code-for-token exchange
//! - User profile fetch to build the identity assertion

use anyhow::{anyhow, Context, Result};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::GithubOauthSettings;
use crate::user::Assertion;

/// Authorization states are one-shot and expire after this many seconds.
const AUTH_STATE_MAX_AGE_SECS: i64 = 300;

/// HTTP client for OAuth requests
fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create HTTP client")
}

/// State stored during the authorization flow (between /github and /callback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    /// CSRF token for state validation
    pub csrf_token: String,
    /// PKCE code verifier (stored server-side for security)
    pub pkce_verifier: String,
    /// Timestamp when this state was created (for expiration)
    pub created_at: i64,
}

/// The GitHub profile fields this server cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUserProfile {
    pub id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
}

impl GithubUserProfile {
    /// The assertion handed to the identity resolver. GitHub's numeric user
    /// id is the stable external key, the login is only a display name.
    pub fn into_assertion(self) -> Assertion {
        Assertion::GitHub {
            github_id: self.id.to_string(),
            display_name: self.login,
            avatar_url: self.avatar_url,
        }
    }
}

/// GitHub OAuth client wrapper
pub struct GithubOauthClient {
    settings: GithubOauthSettings,
}

impl GithubOauthClient {
    pub fn new(settings: GithubOauthSettings) -> Self {
        info!("GitHub OAuth login enabled for client {}", settings.client_id);
        Self { settings }
    }

    /// Where the boundary redirects the browser after a completed login.
    pub fn app_url(&self) -> &str {
        &self.settings.app_url
    }

    fn oauth_client(
        &self,
    ) -> Result<
        BasicClient<
            oauth2::EndpointSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointSet,
        >,
    > {
        let client = BasicClient::new(ClientId::new(self.settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.settings.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(self.settings.authorize_url.clone())
                    .context("Invalid GitHub authorize URL")?,
            )
            .set_token_uri(
                TokenUrl::new(self.settings.token_url.clone())
                    .context("Invalid GitHub token URL")?,
            )
            .set_redirect_uri(
                RedirectUrl::new(self.settings.redirect_uri.clone())
                    .context("Invalid GitHub redirect URI")?,
            );
        Ok(client)
    }

    /// Generate the authorization URL for the GitHub flow.
    ///
    /// Returns the URL to redirect the user to, along with the state that
    /// must be stored server-side and validated in the callback.
    pub fn authorize_url(&self) -> Result<(String, AuthState)> {
        let client = self.oauth_client()?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("read:user".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let state = AuthState {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            created_at: chrono::Utc::now().timestamp(),
        };

        debug!(
            "Generated GitHub authorization URL with state {}",
            state.csrf_token
        );

        Ok((auth_url.to_string(), state))
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Validates the CSRF state and its age before talking to GitHub.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        stored_state: &AuthState,
    ) -> Result<String> {
        if state != stored_state.csrf_token {
            return Err(anyhow!("CSRF state mismatch"));
        }

        let now = chrono::Utc::now().timestamp();
        if now - stored_state.created_at > AUTH_STATE_MAX_AGE_SECS {
            return Err(anyhow!("Authorization state expired"));
        }

        let client = self.oauth_client()?;
        let http = http_client()?;

        let pkce_verifier = PkceCodeVerifier::new(stored_state.pkce_verifier.clone());

        let token_response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http)
            .await
            .map_err(|e| anyhow!("Failed to exchange authorization code: {}", e))?;

        Ok(token_response.access_token().secret().clone())
    }

    /// Fetch the authenticated user's profile from the GitHub API.
    pub async fn fetch_user_profile(&self, access_token: &str) -> Result<GithubUserProfile> {
        let url = format!("{}/user", self.settings.api_base_url.trim_end_matches('/'));
        let response = http_client()?
            .get(&url)
            // GitHub rejects requests without a user agent
            .header(reqwest::header::USER_AGENT, "gamehub-server")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(access_token)
            .send()
            .await
            .context("Failed to reach the GitHub API")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "GitHub profile request failed with status {}",
                response.status()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse GitHub user profile")
    }
}

/// Thread-safe storage for in-flight authorization states, keyed by CSRF
/// token. States are single use: `take` removes on read.
pub struct AuthStateStore {
    states: RwLock<std::collections::HashMap<String, AuthState>>,
}

impl AuthStateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Store an auth state, keyed by the CSRF token
    pub async fn store(&self, state: AuthState) {
        let key = state.csrf_token.clone();
        let mut states = self.states.write().await;
        states.insert(key, state);
    }

    /// Retrieve and remove an auth state by CSRF token
    pub async fn take(&self, csrf_token: &str) -> Option<AuthState> {
        let mut states = self.states.write().await;
        states.remove(csrf_token)
    }

    /// Clean up expired states
    pub async fn cleanup_expired(&self) {
        let now = chrono::Utc::now().timestamp();
        let mut states = self.states.write().await;
        states.retain(|_, state| now - state.created_at < AUTH_STATE_MAX_AGE_SECS);
    }
}

impl Default for AuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}
