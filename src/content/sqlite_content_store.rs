use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::SystemTime,
};
use tracing::info;

use super::content_store::{GameStore, NoteStore, ReviewStore};
use super::models::{Game, GamePayload, Note, NotePayload, Review, ReviewPayload};

/// V 0
const GAME_TABLE_V_0: Table = Table {
    name: "game",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("genres", &SqlType::Text, non_null = true),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("platforms", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("cover_image_url", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[],
};
const NOTE_TABLE_V_0: Table = Table {
    name: "note",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("game_id", &SqlType::Text, non_null = true),
        sqlite_column!("game_title", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_note_user_id", "user_id")],
};
const REVIEW_TABLE_V_0: Table = Table {
    name: "review",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("game_id", &SqlType::Text, non_null = true),
        sqlite_column!("game_title", &SqlType::Text, non_null = true),
        sqlite_column!("author_name", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Real, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("date", &SqlType::Text, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_review_user_id", "user_id"),
        ("idx_review_game_id", "game_id"),
    ],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[GAME_TABLE_V_0, NOTE_TABLE_V_0, REVIEW_TABLE_V_0],
    migration: None,
}];

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(value as u64)
}

/// Content store over its own sqlite file. Notes and reviews reference
/// identities from the user database, so the user-deletion cascade for them
/// runs at the service level via `delete_notes_of_user`/`delete_reviews_of_user`.
#[derive(Clone)]
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        if db_version >= VERSIONED_SCHEMAS.len() as i64 {
            bail!("Database version {} is too new", db_version);
        }
        VERSIONED_SCHEMAS
            .get(db_version as usize)
            .context("Failed to get schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, db_version as usize)?;

        Ok(SqliteContentStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating content db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        Ok(())
    }

    fn game_from_row(row: &rusqlite::Row) -> rusqlite::Result<Game> {
        let genres_json: String = row.get(2)?;
        let platforms_json: String = row.get(4)?;
        Ok(Game {
            id: row.get(0)?,
            title: row.get(1)?,
            genres: serde_json::from_str(&genres_json).unwrap_or_default(),
            release_date: row.get(3)?,
            platforms: serde_json::from_str(&platforms_json).unwrap_or_default(),
            description: row.get(5)?,
            cover_image_url: row.get(6)?,
        })
    }

    fn note_from_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        Ok(Note {
            id: row.get(0)?,
            user_id: row.get(1)?,
            game_id: row.get(2)?,
            game_title: row.get(3)?,
            title: row.get(4)?,
            content: row.get(5)?,
            category: row.get(6)?,
            created: system_time_from_column_result(row.get(7)?),
            updated: system_time_from_column_result(row.get(8)?),
        })
    }

    fn review_from_row(row: &rusqlite::Row) -> rusqlite::Result<Review> {
        Ok(Review {
            id: row.get(0)?,
            user_id: row.get(1)?,
            game_id: row.get(2)?,
            game_title: row.get(3)?,
            author_name: row.get(4)?,
            rating: row.get(5)?,
            content: row.get(6)?,
            date: row.get(7)?,
        })
    }
}

const GAME_COLUMNS: &str =
    "id, title, genres, release_date, platforms, description, cover_image_url";
const NOTE_COLUMNS: &str =
    "id, user_id, game_id, game_title, title, content, category, created, updated";
const REVIEW_COLUMNS: &str =
    "id, user_id, game_id, game_title, author_name, rating, content, date";

impl GameStore for SqliteContentStore {
    fn list_games(&self) -> Result<Vec<Game>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM game ORDER BY created",
            GAME_COLUMNS
        ))?;
        let games = stmt
            .query_map([], Self::game_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(games)
    }

    fn get_game(&self, id: &str) -> Result<Option<Game>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM game WHERE id = ?1", GAME_COLUMNS))?;
        let game = stmt
            .query_row(params![id], Self::game_from_row)
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(game)
    }

    fn insert_game(&self, game: &Game) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO game (id, title, genres, release_date, platforms, description, cover_image_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                game.id,
                game.title,
                serde_json::to_string(&game.genres)?,
                game.release_date,
                serde_json::to_string(&game.platforms)?,
                game.description,
                game.cover_image_url,
            ],
        )?;
        Ok(())
    }

    fn update_game(&self, id: &str, payload: &GamePayload) -> Result<Option<Game>> {
        let changed = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE game SET title = ?1, genres = ?2, release_date = ?3, platforms = ?4, \
                 description = ?5, cover_image_url = ?6 WHERE id = ?7",
                params![
                    payload.title,
                    serde_json::to_string(&payload.genres)?,
                    payload.release_date,
                    serde_json::to_string(&payload.platforms)?,
                    payload.description,
                    payload.cover_image_url,
                    id,
                ],
            )?
        };
        if changed == 0 {
            return Ok(None);
        }
        self.get_game(id)
    }

    fn delete_game(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM game WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl NoteStore for SqliteContentStore {
    fn list_notes(&self) -> Result<Vec<Note>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM note ORDER BY created",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map([], Self::note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM note WHERE id = ?1", NOTE_COLUMNS))?;
        let note = stmt
            .query_row(params![id], Self::note_from_row)
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(note)
    }

    fn notes_for_user(&self, user_id: &str) -> Result<Vec<Note>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM note WHERE user_id = ?1 ORDER BY created",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map(params![user_id], Self::note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    fn insert_note(&self, note: &Note) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO note (id, user_id, game_id, game_title, title, content, category, created, updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                note.id,
                note.user_id,
                note.game_id,
                note.game_title,
                note.title,
                note.content,
                note.category,
                now_secs(),
                now_secs(),
            ],
        )?;
        Ok(())
    }

    fn update_note(&self, id: &str, payload: &NotePayload) -> Result<Option<Note>> {
        let changed = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE note SET game_id = ?1, game_title = ?2, title = ?3, content = ?4, \
                 category = ?5, updated = ?6 WHERE id = ?7",
                params![
                    payload.game_id,
                    payload.game_title,
                    payload.title,
                    payload.content,
                    payload.category,
                    now_secs(),
                    id,
                ],
            )?
        };
        if changed == 0 {
            return Ok(None);
        }
        self.get_note(id)
    }

    fn delete_note(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM note WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn delete_notes_of_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM note WHERE user_id = ?1", params![user_id])?;
        Ok(deleted)
    }
}

impl ReviewStore for SqliteContentStore {
    fn list_reviews(&self) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM review", REVIEW_COLUMNS))?;
        let reviews = stmt
            .query_map([], Self::review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM review WHERE id = ?1", REVIEW_COLUMNS))?;
        let review = stmt
            .query_row(params![id], Self::review_from_row)
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(review)
    }

    fn reviews_for_game(&self, game_id: &str) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM review WHERE game_id = ?1",
            REVIEW_COLUMNS
        ))?;
        let reviews = stmt
            .query_map(params![game_id], Self::review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    fn reviews_for_user(&self, user_id: &str) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM review WHERE user_id = ?1",
            REVIEW_COLUMNS
        ))?;
        let reviews = stmt
            .query_map(params![user_id], Self::review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    fn insert_review(&self, review: &Review) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO review (id, user_id, game_id, game_title, author_name, rating, content, date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                review.id,
                review.user_id,
                review.game_id,
                review.game_title,
                review.author_name,
                review.rating,
                review.content,
                review.date,
            ],
        )?;
        Ok(())
    }

    fn update_review(&self, id: &str, payload: &ReviewPayload) -> Result<Option<Review>> {
        let changed = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE review SET game_id = ?1, game_title = ?2, rating = ?3, content = ?4, \
                 date = COALESCE(?5, date) WHERE id = ?6",
                params![
                    payload.game_id,
                    payload.game_title,
                    payload.rating,
                    payload.content,
                    payload.date,
                    id,
                ],
            )?
        };
        if changed == 0 {
            return Ok(None);
        }
        self.get_review(id)
    }

    fn delete_review(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM review WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn delete_reviews_of_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM review WHERE user_id = ?1", params![user_id])?;
        Ok(deleted)
    }
}
