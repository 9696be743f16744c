use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
use crate::user::auth::{CredentialHasher, SessionToken, SessionTokenValue};
use crate::user::errors::IdentityError;
use crate::user::identity::{LibraryEntry, Role, UserIdentity};
use crate::user::user_store::{UserCredentialsStore, UserStore, UserTokenStore};
use crate::user::UsernamePasswordCredentials;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex},
    time::SystemTime,
};
use tracing::info;

const IDENTITY_FK: ForeignKey = ForeignKey {
    foreign_table: "identity",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const IDENTITY_TABLE_V_0: Table = Table {
    name: "identity",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "display_name",
            &SqlType::Text,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("github_id", &SqlType::Text, is_unique = true),
        sqlite_column!("avatar_url", &SqlType::Text),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_identity_github_id", "github_id"),
        ("idx_identity_display_name", "display_name"),
    ],
};
const LIBRARY_ENTRY_TABLE_V_0: Table = Table {
    name: "library_entry",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&IDENTITY_FK)
        ),
        sqlite_column!("game_id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("platforms", &SqlType::Text, non_null = true),
        sqlite_column!("cover_image_url", &SqlType::Text),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["user_id", "game_id"]],
    indices: &[("idx_library_entry_user_id", "user_id")],
};
const PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&IDENTITY_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};
const SESSION_TOKEN_TABLE_V_0: Table = Table {
    name: "session_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&IDENTITY_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_session_token_value", "value")],
};

/// V 1: the revision counter backing conditional library writes.
/// ALTER TABLE appends, so the column sits last.
const IDENTITY_TABLE_V_1: Table = Table {
    name: "identity",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "display_name",
            &SqlType::Text,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("github_id", &SqlType::Text, is_unique = true),
        sqlite_column!("avatar_url", &SqlType::Text),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "revision",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_identity_github_id", "github_id"),
        ("idx_identity_display_name", "display_name"),
    ],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            IDENTITY_TABLE_V_0,
            LIBRARY_ENTRY_TABLE_V_0,
            PASSWORD_CREDENTIALS_TABLE_V_0,
            SESSION_TOKEN_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            IDENTITY_TABLE_V_1,
            LIBRARY_ENTRY_TABLE_V_0,
            PASSWORD_CREDENTIALS_TABLE_V_0,
            SESSION_TOKEN_TABLE_V_0,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute(
                "ALTER TABLE identity ADD COLUMN revision INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
            Ok(())
        }),
    },
];

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(value as u64)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
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

        // Cascading deletes only work with foreign keys enabled, which
        // sqlite does not do by default on freshly opened connections.
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        // Read the database version
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
        let version = db_version as usize;

        if db_version >= VERSIONED_SCHEMAS.len() as i64 {
            bail!("Database version {} is too new", db_version);
        } else {
            VERSIONED_SCHEMAS
                .get(version)
                .context("Failed to get schema")?
                .validate(&conn)?;
        }

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn infer_path() -> Option<PathBuf> {
        let db_data_dir = PathBuf::from("/data/db/users.db");
        if db_data_dir.exists() {
            return Some(db_data_dir);
        }

        let mut current_dir = std::env::current_dir().ok()?;
        loop {
            if let Ok(entries) = std::fs::read_dir(&current_dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_file() && path.file_name().is_some_and(|s| s == "users.db") {
                        return Some(path);
                    }
                }
            }
            if let Some(parent) = current_dir.parent() {
                current_dir = parent.to_path_buf();
            } else {
                break;
            }
        }

        None
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating user db from version {} to {}",
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

    fn load_library(conn: &Connection, user_id: &str) -> Result<Vec<LibraryEntry>> {
        let mut stmt = conn.prepare(
            "SELECT game_id, title, platforms, cover_image_url FROM library_entry \
             WHERE user_id = ?1 ORDER BY position",
        )?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                let platforms_json: String = row.get(2)?;
                Ok(LibraryEntry {
                    game_id: row.get(0)?,
                    title: row.get(1)?,
                    platforms: serde_json::from_str(&platforms_json).unwrap_or_default(),
                    cover_image_url: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn load_identity_where(
        conn: &Connection,
        column: &str,
        key: &str,
    ) -> Result<Option<UserIdentity>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, display_name, github_id, avatar_url, role, revision, created, updated \
             FROM identity WHERE {} = ?1",
            column
        ))?;
        let identity = stmt
            .query_row(params![key], |row| {
                let role_str: String = row.get(4)?;
                Ok(UserIdentity {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    github_id: row.get(2)?,
                    avatar_url: row.get(3)?,
                    role: Role::from_str(&role_str).unwrap_or(Role::User),
                    library: vec![],
                    revision: row.get::<_, i64>(5)? as u64,
                    created: system_time_from_column_result(row.get(6)?),
                    updated: system_time_from_column_result(row.get(7)?),
                })
            })
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match identity {
            None => Ok(None),
            Some(mut identity) => {
                identity.library = Self::load_library(conn, &identity.id)?;
                Ok(Some(identity))
            }
        }
    }

    fn insert_library_rows(
        conn: &Connection,
        user_id: &str,
        entries: &[LibraryEntry],
    ) -> Result<()> {
        for (position, entry) in entries.iter().enumerate() {
            conn.execute(
                "INSERT INTO library_entry (user_id, game_id, title, platforms, cover_image_url, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id,
                    entry.game_id,
                    entry.title,
                    serde_json::to_string(&entry.platforms)?,
                    entry.cover_image_url,
                    position as i64,
                ],
            )?;
        }
        Ok(())
    }
}

impl UserStore for SqliteUserStore {
    fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>> {
        let conn = self.conn.lock().unwrap();
        Self::load_identity_where(&conn, "id", id)
    }

    fn find_by_github_id(&self, github_id: &str) -> Result<Option<UserIdentity>> {
        let conn = self.conn.lock().unwrap();
        Self::load_identity_where(&conn, "github_id", github_id)
    }

    fn find_by_display_name(&self, display_name: &str) -> Result<Option<UserIdentity>> {
        let conn = self.conn.lock().unwrap();
        Self::load_identity_where(&conn, "display_name", display_name)
    }

    fn list_identities(&self) -> Result<Vec<UserIdentity>> {
        let ids = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare("SELECT id FROM identity ORDER BY created")?;
            let ids = stmt.query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let mut identities = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(identity) = self.find_by_id(&id)? {
                identities.push(identity);
            }
        }
        Ok(identities)
    }

    fn create_identity(&self, identity: &UserIdentity) -> Result<UserIdentity, IdentityError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(anyhow::Error::from)?;

        let inserted = tx.execute(
            "INSERT INTO identity (id, display_name, github_id, avatar_url, role, revision, created, updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                identity.id,
                identity.display_name,
                identity.github_id,
                identity.avatar_url,
                identity.role.as_str(),
                identity.revision as i64,
                now_secs(),
                now_secs(),
            ],
        );
        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                let key = identity
                    .github_id
                    .clone()
                    .unwrap_or_else(|| identity.display_name.clone());
                return Err(IdentityError::Duplicate(key));
            }
            return Err(IdentityError::Store(err.into()));
        }

        Self::insert_library_rows(&tx, &identity.id, &identity.library)
            .map_err(IdentityError::Store)?;
        tx.commit().map_err(anyhow::Error::from)?;

        Self::load_identity_where(&conn, "id", &identity.id)?
            .ok_or_else(|| IdentityError::NotFound(identity.id.clone()))
    }

    fn update_profile(
        &self,
        id: &str,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<UserIdentity>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE identity SET \
                display_name = COALESCE(?1, display_name), \
                avatar_url = COALESCE(?2, avatar_url), \
                revision = revision + 1, \
                updated = ?3 \
             WHERE id = ?4",
            params![display_name, avatar_url, now_secs(), id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::load_identity_where(&conn, "id", id)
    }

    fn set_role(&self, id: &str, role: Role) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE identity SET role = ?1, revision = revision + 1, updated = ?2 WHERE id = ?3",
            params![role.as_str(), now_secs(), id],
        )?;
        Ok(())
    }

    fn save_library(
        &self,
        user_id: &str,
        expected_revision: u64,
        entries: &[LibraryEntry],
    ) -> Result<Option<UserIdentity>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // The revision check makes the whole read-modify-write cycle safe:
        // a concurrent writer bumps the revision and this update matches
        // zero rows, leaving the transaction without effect.
        let changed = tx.execute(
            "UPDATE identity SET revision = revision + 1, updated = ?1 \
             WHERE id = ?2 AND revision = ?3",
            params![now_secs(), user_id, expected_revision as i64],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        tx.execute(
            "DELETE FROM library_entry WHERE user_id = ?1",
            params![user_id],
        )?;
        Self::insert_library_rows(&tx, user_id, entries)?;
        tx.commit()?;

        Self::load_identity_where(&conn, "id", user_id)
    }

    fn delete_identity(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM identity WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl UserCredentialsStore for SqliteUserStore {
    fn get_credentials(&self, user_id: &str) -> Result<Option<UsernamePasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, salt, hash, hasher, created, last_tried, last_used \
             FROM password_credentials WHERE user_id = ?1",
        )?;
        let credentials = stmt
            .query_row(params![user_id], |row| {
                let hasher_str: String = row.get(3)?;
                let hasher = CredentialHasher::from_str(&hasher_str).map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "hasher".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?;
                Ok(UsernamePasswordCredentials {
                    user_id: row.get(0)?,
                    salt: row.get(1)?,
                    hash: row.get(2)?,
                    hasher,
                    created: system_time_from_column_result(row.get(4)?),
                    last_tried: row
                        .get::<_, Option<i64>>(5)?
                        .map(system_time_from_column_result),
                    last_used: row
                        .get::<_, Option<i64>>(6)?
                        .map(system_time_from_column_result),
                })
            })
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(credentials)
    }

    fn upsert_credentials(&self, credentials: UsernamePasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE password_credentials SET salt = ?1, hash = ?2, hasher = ?3 WHERE user_id = ?4",
            params![
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                credentials.user_id,
            ],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
                params![
                    credentials.user_id,
                    credentials.salt,
                    credentials.hash,
                    credentials.hasher.to_string(),
                ],
            )?;
        }
        Ok(())
    }

    fn delete_credentials(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM password_credentials WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}

impl UserTokenStore for SqliteUserStore {
    fn get_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, value, created, last_used FROM session_token WHERE value = ?1",
        )?;
        let token = stmt
            .query_row(params![value.0], |row| {
                Ok(SessionToken {
                    user_id: row.get(0)?,
                    value: SessionTokenValue(row.get(1)?),
                    created: system_time_from_column_result(row.get(2)?),
                    last_used: row
                        .get::<_, Option<i64>>(3)?
                        .map(system_time_from_column_result),
                })
            })
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(token)
    }

    fn add_session_token(&self, token: SessionToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO session_token (user_id, value) VALUES (?1, ?2)",
            params![token.user_id, token.value.0],
        )?;
        Ok(())
    }

    fn delete_session_token(&self, value: &SessionTokenValue) -> Result<Option<SessionToken>> {
        let token = self.get_session_token(value)?;
        if token.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM session_token WHERE value = ?1",
                params![value.0],
            )?;
        }
        Ok(token)
    }

    fn touch_session_token(&self, value: &SessionTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE session_token SET last_used = ?1 WHERE value = ?2",
            params![now_secs(), value.0],
        )?;
        Ok(())
    }

    fn tokens_for_user(&self, user_id: &str) -> Result<Vec<SessionToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, value, created, last_used FROM session_token WHERE user_id = ?1",
        )?;
        let tokens = stmt
            .query_map(params![user_id], |row| {
                Ok(SessionToken {
                    user_id: row.get(0)?,
                    value: SessionTokenValue(row.get(1)?),
                    created: system_time_from_column_result(row.get(2)?),
                    last_used: row
                        .get::<_, Option<i64>>(3)?
                        .map(system_time_from_column_result),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    fn prune_unused_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let cutoff = now_secs() - (unused_for_days as i64) * 24 * 60 * 60;
        let deleted = conn.execute(
            "DELETE FROM session_token WHERE COALESCE(last_used, created) < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}
