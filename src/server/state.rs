use axum::extract::FromRef;

use crate::content::ContentStore;
use crate::github::{AuthStateStore, GithubOauthClient};
use crate::rawg::RawgClient;
use crate::user::{AccountManager, FullUserStore, IdentityResolver, LibrarySet};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserStore = Arc<dyn FullUserStore>;
pub type GuardedContentStore = Arc<dyn ContentStore>;
pub type GuardedAccountManager = Arc<AccountManager>;
pub type GuardedIdentityResolver = Arc<IdentityResolver>;
pub type GuardedLibrarySet = Arc<LibrarySet>;
pub type OptionalRawgClient = Option<Arc<RawgClient>>;
pub type OptionalGithubOauth = Option<Arc<GithubOauthClient>>;
pub type GuardedAuthStateStore = Arc<AuthStateStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_store: GuardedUserStore,
    pub content_store: GuardedContentStore,
    pub accounts: GuardedAccountManager,
    pub identity_resolver: GuardedIdentityResolver,
    pub library: GuardedLibrarySet,
    pub rawg: OptionalRawgClient,
    pub github_oauth: OptionalGithubOauth,
    pub auth_state_store: GuardedAuthStateStore,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for GuardedContentStore {
    fn from_ref(input: &ServerState) -> Self {
        input.content_store.clone()
    }
}

impl FromRef<ServerState> for GuardedAccountManager {
    fn from_ref(input: &ServerState) -> Self {
        input.accounts.clone()
    }
}

impl FromRef<ServerState> for GuardedIdentityResolver {
    fn from_ref(input: &ServerState) -> Self {
        input.identity_resolver.clone()
    }
}

impl FromRef<ServerState> for GuardedLibrarySet {
    fn from_ref(input: &ServerState) -> Self {
        input.library.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for OptionalRawgClient {
    fn from_ref(input: &ServerState) -> Self {
        input.rawg.clone()
    }
}

impl FromRef<ServerState> for OptionalGithubOauth {
    fn from_ref(input: &ServerState) -> Self {
        input.github_oauth.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthStateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_state_store.clone()
    }
}
