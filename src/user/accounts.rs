//! Account management: registration, password credentials, sessions, roles.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use super::auth::{SessionToken, SessionTokenValue, UsernamePasswordCredentials};
use super::errors::IdentityError;
use super::identity::{Role, UserIdentity};
use super::user_store::FullUserStore;

pub struct AccountManager {
    store: Arc<dyn FullUserStore>,
}

impl AccountManager {
    pub fn new(store: Arc<dyn FullUserStore>) -> Self {
        Self { store }
    }

    /// Explicit local registration: allocates a fresh identity with hashed
    /// credentials. Fails with `Duplicate` when the username is taken.
    pub fn register(&self, username: &str, password: &str) -> Result<UserIdentity, IdentityError> {
        if username.is_empty() {
            return Err(IdentityError::Store(anyhow::anyhow!(
                "The username cannot be empty."
            )));
        }

        let identity = UserIdentity::from_registration(username);
        let created = self.store.create_identity(&identity)?;

        let credentials = UsernamePasswordCredentials::from_plain_password(&created.id, password)
            .context("Failed to hash password")?;
        self.store.upsert_credentials(credentials)?;

        info!("registered local identity {} ({})", created.id, username);
        Ok(created)
    }

    /// Creates an identity without credentials (operator tooling; the user
    /// gets a password via `create_password` afterwards).
    pub fn create_user(&self, username: &str) -> Result<UserIdentity, IdentityError> {
        if username.is_empty() {
            return Err(IdentityError::Store(anyhow::anyhow!(
                "The username cannot be empty."
            )));
        }
        self.store
            .create_identity(&UserIdentity::from_registration(username))
    }

    /// Creates password credentials for an existing identity. Fails if the
    /// user already has a password set (use `update_password` instead).
    pub fn create_password(&self, username: &str, password: &str) -> Result<()> {
        let user = self.require_user(username)?;
        if self.store.get_credentials(&user.id)?.is_some() {
            bail!(
                "User {} already has password credentials. Maybe you want to update them?",
                username
            );
        }
        let credentials = UsernamePasswordCredentials::from_plain_password(&user.id, password)?;
        self.store.upsert_credentials(credentials)
    }

    /// Changes the password of a user, fails if no password was ever set.
    pub fn update_password(&self, username: &str, password: &str) -> Result<()> {
        let user = self.require_user(username)?;
        if self.store.get_credentials(&user.id)?.is_none() {
            bail!(
                "Cannot update password of user {} since none was ever set.",
                username
            );
        }
        let credentials = UsernamePasswordCredentials::from_plain_password(&user.id, password)?;
        self.store.upsert_credentials(credentials)
    }

    pub fn delete_password(&self, username: &str) -> Result<()> {
        let user = self.require_user(username)?;
        self.store.delete_credentials(&user.id)
    }

    /// Verifies a username/password pair. Returns the identity on success,
    /// None on unknown user, missing credentials or wrong password.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<Option<UserIdentity>> {
        let user = match self.store.find_by_display_name(username)? {
            Some(user) => user,
            None => return Ok(None),
        };
        let credentials = match self.store.get_credentials(&user.id)? {
            Some(credentials) => credentials,
            None => return Ok(None),
        };
        if credentials.verify(password)? {
            Ok(Some(user))
        } else {
            debug!("password verification failed for {}", username);
            Ok(None)
        }
    }

    /// Issues and persists a new session token for the given identity.
    pub fn issue_session(&self, user_id: &str) -> Result<SessionToken> {
        let token = SessionToken::issue(user_id);
        self.store.add_session_token(token.clone())?;
        Ok(token)
    }

    pub fn get_session(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>> {
        self.store.get_session_token(value)
    }

    pub fn touch_session(&self, value: &SessionTokenValue) -> Result<()> {
        self.store.touch_session_token(value)
    }

    /// Deletes a session token after checking it belongs to the caller. The
    /// token is reinstated if it turns out to belong to somebody else.
    pub fn end_session(&self, user_id: &str, value: &SessionTokenValue) -> Result<()> {
        match self.store.delete_session_token(value)? {
            Some(removed) => {
                if removed.user_id == user_id {
                    Ok(())
                } else {
                    let _ = self.store.add_session_token(removed.clone());
                    bail!(
                        "Tried to delete session token of user {}, but the caller {} is not its owner.",
                        removed.user_id,
                        user_id
                    )
                }
            }
            None => bail!("Session token not found"),
        }
    }

    pub fn sessions_for_user(&self, username: &str) -> Result<Vec<SessionToken>> {
        let user = self.require_user(username)?;
        self.store.tokens_for_user(&user.id)
    }

    pub fn prune_unused_sessions(&self, unused_for_days: u64) -> Result<usize> {
        self.store.prune_unused_tokens(unused_for_days)
    }

    pub fn set_role(&self, username: &str, role: Role) -> Result<()> {
        let user = self.require_user(username)?;
        self.store.set_role(&user.id, role)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserIdentity>> {
        self.store.find_by_display_name(username)
    }

    pub fn list_usernames(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_identities()?
            .into_iter()
            .map(|i| i.display_name)
            .collect())
    }

    fn require_user(&self, username: &str) -> Result<UserIdentity> {
        self.store
            .find_by_display_name(username)?
            .with_context(|| format!("User {} not found.", username))
    }
}
