mod content_store;
pub mod models;
mod sqlite_content_store;

pub use content_store::{ContentStore, GameStore, NoteStore, ReviewStore};
pub use models::{Game, GamePayload, Note, NotePayload, Review, ReviewPayload};
pub use sqlite_content_store::SqliteContentStore;
