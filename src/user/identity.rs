//! User identity models
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Canonical internal representation of an authenticated principal.
///
/// `id` is assigned once on creation and never reused. `revision` counts
/// persisted writes and backs the conditional-write discipline of the store.
#[derive(Debug, Clone, Serialize)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
    pub github_id: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub library: Vec<LibraryEntry>,
    pub revision: u64,
    pub created: SystemTime,
    pub updated: SystemTime,
}

impl UserIdentity {
    /// A fresh identity for a first GitHub login. Not yet persisted.
    pub fn from_github_login(
        github_id: &str,
        display_name: &str,
        avatar_url: Option<String>,
    ) -> Self {
        let now = SystemTime::now();
        UserIdentity {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            github_id: Some(github_id.to_string()),
            avatar_url,
            role: Role::User,
            library: vec![],
            revision: 0,
            created: now,
            updated: now,
        }
    }

    /// A fresh identity for explicit local registration. Not yet persisted.
    pub fn from_registration(display_name: &str) -> Self {
        let now = SystemTime::now();
        UserIdentity {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            github_id: None,
            avatar_url: None,
            role: Role::User,
            library: vec![],
            revision: 0,
            created: now,
            updated: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A game reference held in a user's personal collection.
///
/// Membership is keyed by `game_id` alone; title, platforms and cover image
/// are cosmetic and do not participate in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub game_id: String,
    pub title: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub cover_image_url: Option<String>,
}

/// An authentication assertion handed over by the boundary, already resolved
/// to one of the two supported schemes. Business logic never inspects raw
/// principals.
#[derive(Debug, Clone)]
pub enum Assertion {
    GitHub {
        github_id: String,
        display_name: String,
        avatar_url: Option<String>,
    },
    Local {
        username: String,
    },
}

/// The public view of an identity returned by the API. Never carries
/// credentials or the revision counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub github_id: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub library: Vec<LibraryEntry>,
}

impl From<&UserIdentity> for UserView {
    fn from(identity: &UserIdentity) -> Self {
        UserView {
            id: identity.id.clone(),
            github_id: identity.github_id.clone(),
            display_name: identity.display_name.clone(),
            avatar_url: identity.avatar_url.clone(),
            role: identity.role,
            library: identity.library.clone(),
        }
    }
}
