//! Catalog and user-content models

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::user::Owned;

/// A game in the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Incoming payload for creating or updating a catalog game.
#[derive(Debug, Clone, Deserialize)]
pub struct GamePayload {
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
}

impl Game {
    pub fn from_payload(payload: &GamePayload) -> Self {
        Game {
            id: uuid::Uuid::new_v4().to_string(),
            title: payload.title.clone(),
            genres: payload.genres.clone(),
            release_date: payload.release_date.clone(),
            platforms: payload.platforms.clone(),
            description: payload.description.clone(),
            cover_image_url: payload.cover_image_url.clone(),
        }
    }
}

/// A private note a user keeps about a game.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub game_id: String,
    pub game_title: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created: SystemTime,
    pub updated: SystemTime,
}

/// Incoming payload for creating or updating a note. The owner is always the
/// resolved caller, never part of the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NotePayload {
    pub game_id: String,
    pub game_title: String,
    pub title: String,
    pub content: String,
    pub category: String,
}

impl Note {
    pub fn from_payload(owner_id: &str, payload: &NotePayload) -> Self {
        let now = SystemTime::now();
        Note {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            game_id: payload.game_id.clone(),
            game_title: payload.game_title.clone(),
            title: payload.title.clone(),
            content: payload.content.clone(),
            category: payload.category.clone(),
            created: now,
            updated: now,
        }
    }
}

impl Owned for Note {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

/// A public review of a game.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub game_id: String,
    pub game_title: String,
    pub author_name: String,
    pub rating: f64,
    pub content: String,
    pub date: String,
}

/// Incoming payload for creating or updating a review. Owner and author name
/// come from the resolved caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    pub game_id: String,
    pub game_title: String,
    pub rating: f64,
    pub content: String,
    pub date: Option<String>,
}

impl Review {
    pub fn from_payload(owner_id: &str, author_name: &str, payload: &ReviewPayload) -> Self {
        Review {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            game_id: payload.game_id.clone(),
            game_title: payload.game_title.clone(),
            author_name: author_name.to_string(),
            rating: payload.rating,
            content: payload.content.clone(),
            date: payload
                .date
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string()),
        }
    }
}

impl Owned for Review {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}
