use super::auth::{SessionToken, SessionTokenValue, UsernamePasswordCredentials};
use super::errors::IdentityError;
use super::identity::{LibraryEntry, Role, UserIdentity};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Returns the identity with the given internal id.
    /// Returns Ok(None) if no such identity exists.
    /// Returns Err if there is a database error.
    fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>>;

    /// Returns the identity linked to the given GitHub id.
    /// Returns Ok(None) if no such identity exists.
    fn find_by_github_id(&self, github_id: &str) -> Result<Option<UserIdentity>>;

    /// Returns the identity with the given display name (the local login key).
    /// Returns Ok(None) if no such identity exists.
    fn find_by_display_name(&self, display_name: &str) -> Result<Option<UserIdentity>>;

    /// Returns all identities.
    fn list_identities(&self) -> Result<Vec<UserIdentity>>;

    /// Persists a freshly constructed identity and returns the stored value.
    /// Fails with `IdentityError::Duplicate` when the display name or GitHub
    /// id is already taken; the store guarantees uniqueness of both.
    fn create_identity(&self, identity: &UserIdentity) -> Result<UserIdentity, IdentityError>;

    /// Updates display name and/or avatar, bumps the revision and the
    /// updated stamp. Returns Ok(None) if the identity does not exist.
    fn update_profile(
        &self,
        id: &str,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<UserIdentity>>;

    /// Changes the role of an identity.
    fn set_role(&self, id: &str, role: Role) -> Result<()>;

    /// Replaces the library of the identity, conditional on
    /// `expected_revision` still being current. Returns the updated identity,
    /// or Ok(None) when a concurrent writer bumped the revision first (the
    /// caller is expected to re-read and retry).
    fn save_library(
        &self,
        user_id: &str,
        expected_revision: u64,
        entries: &[LibraryEntry],
    ) -> Result<Option<UserIdentity>>;

    /// Deletes the identity and, by cascade, its library entries,
    /// credentials, session tokens and owned content. Returns whether an
    /// identity was actually removed.
    fn delete_identity(&self, id: &str) -> Result<bool>;
}

pub trait UserCredentialsStore: Send + Sync {
    /// Returns the password credentials of the given user.
    /// Returns Ok(None) if the user has no password set.
    fn get_credentials(&self, user_id: &str) -> Result<Option<UsernamePasswordCredentials>>;

    /// Creates or replaces the password credentials of a user.
    fn upsert_credentials(&self, credentials: UsernamePasswordCredentials) -> Result<()>;

    /// Removes the password credentials of a user, if any.
    fn delete_credentials(&self, user_id: &str) -> Result<()>;
}

pub trait UserTokenStore: Send + Sync {
    /// Returns a session token by its value.
    /// Returns Ok(None) if the token does not exist.
    fn get_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>>;

    /// Adds a new session token.
    fn add_session_token(&self, token: SessionToken) -> Result<()>;

    /// Deletes a session token, returning the deleted record if it existed.
    fn delete_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>>;

    /// Stamps the token's last_used with the current time.
    fn touch_session_token(&self, value: &SessionTokenValue) -> Result<()>;

    /// Returns all session tokens of a user.
    fn tokens_for_user(&self, user_id: &str) -> Result<Vec<SessionToken>>;

    /// Prunes tokens that haven't been used for the given number of days.
    /// Returns the number of tokens deleted.
    fn prune_unused_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

/// Combined trait for the full user persistence surface.
pub trait FullUserStore: UserStore + UserCredentialsStore + UserTokenStore {}

// Blanket implementation for any type covering all three store traits
impl<T: UserStore + UserCredentialsStore + UserTokenStore> FullUserStore for T {}
