use super::models::{Game, GamePayload, Note, NotePayload, Review, ReviewPayload};
use anyhow::Result;

pub trait GameStore: Send + Sync {
    /// Returns all catalog games.
    fn list_games(&self) -> Result<Vec<Game>>;

    /// Returns a game by id, Ok(None) when absent.
    fn get_game(&self, id: &str) -> Result<Option<Game>>;

    /// Persists a new catalog game.
    fn insert_game(&self, game: &Game) -> Result<()>;

    /// Applies the payload to an existing game and returns the updated
    /// record, Ok(None) when the id is unknown.
    fn update_game(&self, id: &str, payload: &GamePayload) -> Result<Option<Game>>;

    /// Deletes a game, returns whether a row was removed.
    fn delete_game(&self, id: &str) -> Result<bool>;
}

pub trait NoteStore: Send + Sync {
    fn list_notes(&self) -> Result<Vec<Note>>;

    fn get_note(&self, id: &str) -> Result<Option<Note>>;

    fn notes_for_user(&self, user_id: &str) -> Result<Vec<Note>>;

    fn insert_note(&self, note: &Note) -> Result<()>;

    /// Applies the payload and refreshes the updated stamp. The ownership
    /// check is the caller's job and must happen before this write.
    fn update_note(&self, id: &str, payload: &NotePayload) -> Result<Option<Note>>;

    fn delete_note(&self, id: &str) -> Result<bool>;

    /// Removes all notes of a user (identity deletion cascade).
    fn delete_notes_of_user(&self, user_id: &str) -> Result<usize>;
}

pub trait ReviewStore: Send + Sync {
    fn list_reviews(&self) -> Result<Vec<Review>>;

    fn get_review(&self, id: &str) -> Result<Option<Review>>;

    fn reviews_for_game(&self, game_id: &str) -> Result<Vec<Review>>;

    fn reviews_for_user(&self, user_id: &str) -> Result<Vec<Review>>;

    fn insert_review(&self, review: &Review) -> Result<()>;

    /// Applies the payload to an existing review. The ownership check is the
    /// caller's job and must happen before this write.
    fn update_review(&self, id: &str, payload: &ReviewPayload) -> Result<Option<Review>>;

    fn delete_review(&self, id: &str) -> Result<bool>;

    /// Removes all reviews of a user (identity deletion cascade).
    fn delete_reviews_of_user(&self, user_id: &str) -> Result<usize>;
}

/// Combined trait for the content persistence surface.
pub trait ContentStore: GameStore + NoteStore + ReviewStore {}

impl<T: GameStore + NoteStore + ReviewStore> ContentStore for T {}
