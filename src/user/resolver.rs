//! Maps authentication assertions to canonical identities.

use std::sync::Arc;

use tracing::{debug, info};

use super::errors::IdentityError;
use super::identity::{Assertion, UserIdentity};
use super::user_store::FullUserStore;

/// Resolves an inbound authentication assertion to the canonical internal
/// identity, creating one on a first GitHub login.
///
/// Local principals are never auto-created here; they only come into
/// existence through explicit registration.
pub struct IdentityResolver {
    store: Arc<dyn FullUserStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn FullUserStore>) -> Self {
        Self { store }
    }

    pub fn resolve(&self, assertion: Assertion) -> Result<UserIdentity, IdentityError> {
        match assertion {
            Assertion::GitHub {
                github_id,
                display_name,
                avatar_url,
            } => {
                if let Some(existing) = self.store.find_by_github_id(&github_id)? {
                    debug!("resolved github id {} to existing identity", github_id);
                    return Ok(existing);
                }

                let fresh = UserIdentity::from_github_login(&github_id, &display_name, avatar_url);
                match self.store.create_identity(&fresh) {
                    Ok(created) => {
                        info!(
                            "created identity {} for first github login {}",
                            created.id, github_id
                        );
                        Ok(created)
                    }
                    // Lost a concurrent first-login race: the store's
                    // uniqueness constraint kept a single row, use that one.
                    Err(IdentityError::Duplicate(_)) => self
                        .store
                        .find_by_github_id(&github_id)?
                        .ok_or(IdentityError::NotFound(github_id)),
                    Err(err) => Err(err),
                }
            }
            Assertion::Local { username } => self
                .store
                .find_by_display_name(&username)?
                .ok_or(IdentityError::NotFound(username)),
        }
    }
}
