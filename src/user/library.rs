//! Library membership as an id-keyed set with copy-on-write updates.

use std::sync::Arc;

use tracing::debug;

use super::errors::LibraryError;
use super::identity::{LibraryEntry, UserIdentity};
use super::user_store::FullUserStore;

/// Retries for the optimistic-concurrency loop before giving up with
/// `LibraryError::Conflict`.
const MAX_WRITE_RETRIES: usize = 3;

/// Returns the library with `entry` appended, or `None` when an entry with
/// the same game_id is already present. The input is never mutated; existing
/// entries keep their original fields (first write wins).
pub fn with_entry(library: &[LibraryEntry], entry: LibraryEntry) -> Option<Vec<LibraryEntry>> {
    if library.iter().any(|e| e.game_id == entry.game_id) {
        return None;
    }
    let mut updated = library.to_vec();
    updated.push(entry);
    Some(updated)
}

/// Returns the library without the entry matching `game_id`, or `None` when
/// no such entry exists. Insertion order of the remaining entries is kept.
pub fn without_entry(library: &[LibraryEntry], game_id: &str) -> Option<Vec<LibraryEntry>> {
    if !library.iter().any(|e| e.game_id == game_id) {
        return None;
    }
    Some(
        library
            .iter()
            .filter(|e| e.game_id != game_id)
            .cloned()
            .collect(),
    )
}

/// Manages the set of games a user owns. Both operations are idempotent and
/// persist through a conditional write keyed on the identity revision, so
/// concurrent updates to the same user never lose entries to each other.
pub struct LibrarySet {
    store: Arc<dyn FullUserStore>,
}

impl LibrarySet {
    pub fn new(store: Arc<dyn FullUserStore>) -> Self {
        Self { store }
    }

    /// Adds `entry` to the user's library. A no-op (without a write) when an
    /// entry with the same game_id is already present. Returns the
    /// authoritative post-write identity.
    pub fn add(&self, user_id: &str, entry: LibraryEntry) -> Result<UserIdentity, LibraryError> {
        for attempt in 0..MAX_WRITE_RETRIES {
            let user = self
                .store
                .find_by_id(user_id)?
                .ok_or_else(|| LibraryError::UserNotFound(user_id.to_string()))?;

            let updated_library = match with_entry(&user.library, entry.clone()) {
                // Already owned: return the stored state unchanged
                None => return Ok(user),
                Some(library) => library,
            };

            match self
                .store
                .save_library(user_id, user.revision, &updated_library)?
            {
                Some(updated) => return Ok(updated),
                None => {
                    debug!(
                        "library add for {} lost revision {} (attempt {}), retrying",
                        user_id, user.revision, attempt
                    );
                }
            }
        }
        Err(LibraryError::Conflict(user_id.to_string()))
    }

    /// Removes the entry matching `game_id` from the user's library. Removing
    /// an absent entry is a no-op, not an error.
    pub fn remove(&self, user_id: &str, game_id: &str) -> Result<UserIdentity, LibraryError> {
        for attempt in 0..MAX_WRITE_RETRIES {
            let user = self
                .store
                .find_by_id(user_id)?
                .ok_or_else(|| LibraryError::UserNotFound(user_id.to_string()))?;

            let updated_library = match without_entry(&user.library, game_id) {
                None => return Ok(user),
                Some(library) => library,
            };

            match self
                .store
                .save_library(user_id, user.revision, &updated_library)?
            {
                Some(updated) => return Ok(updated),
                None => {
                    debug!(
                        "library remove for {} lost revision {} (attempt {}), retrying",
                        user_id, user.revision, attempt
                    );
                }
            }
        }
        Err(LibraryError::Conflict(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(game_id: &str, title: &str) -> LibraryEntry {
        LibraryEntry {
            game_id: game_id.to_string(),
            title: title.to_string(),
            platforms: vec!["PC".to_string()],
            cover_image_url: None,
        }
    }

    #[test]
    fn with_entry_appends_preserving_order() {
        let library = vec![entry("g1", "First"), entry("g2", "Second")];
        let updated = with_entry(&library, entry("g3", "Third")).unwrap();
        let ids: Vec<&str> = updated.iter().map(|e| e.game_id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn with_entry_dedups_by_game_id_only() {
        let library = vec![entry("g1", "Foo")];
        // Same game_id, different cosmetic fields: still a duplicate
        assert!(with_entry(&library, entry("g1", "Foo Renamed")).is_none());
    }

    #[test]
    fn with_entry_does_not_mutate_input() {
        let library = vec![entry("g1", "Foo")];
        let _ = with_entry(&library, entry("g2", "Bar"));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn without_entry_removes_only_match() {
        let library = vec![entry("g1", "First"), entry("g2", "Second")];
        let updated = without_entry(&library, "g1").unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].game_id, "g2");
    }

    #[test]
    fn without_entry_is_none_for_absent_id() {
        let library = vec![entry("g1", "First")];
        assert!(without_entry(&library, "g9").is_none());
    }
}
