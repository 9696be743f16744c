//! Ownership checks for user-owned resources.

use super::errors::OwnershipError;
use super::identity::UserIdentity;

/// A resource bound to the identity that created it.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

/// Authorizes mutation of an owned resource. Pure comparison, no I/O: the
/// caller identity must already be resolved, and the check must run before
/// any write so a rejection leaves no partial effect.
pub struct OwnershipGuard;

impl OwnershipGuard {
    pub fn authorize(resource: &impl Owned, caller: &UserIdentity) -> Result<(), OwnershipError> {
        if resource.owner_id() == caller.id {
            Ok(())
        } else {
            Err(OwnershipError::Forbidden)
        }
    }
}
