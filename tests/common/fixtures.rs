//! Test fixture creation for the user and content databases

use super::constants::*;
use anyhow::Result;
use gamehub_server::content::{Game, GameStore, SqliteContentStore};
use gamehub_server::user::identity::UserIdentity;
use gamehub_server::user::{
    Role, SqliteUserStore, UserCredentialsStore, UserStore, UsernamePasswordCredentials,
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary directory holding a users.db seeded with the standard
/// test users and a content.db seeded with two catalog games.
/// Returns (temp_dir, users_db_path, content_db_path).
pub fn create_test_databases() -> Result<(TempDir, PathBuf, PathBuf)> {
    let temp_dir = TempDir::new()?;

    let users_db_path = temp_dir.path().join("users.db");
    {
        let store = SqliteUserStore::new(&users_db_path)?;
        create_user_with_password_and_role(&store, TEST_USER, TEST_PASS, Role::User)?;
        create_user_with_password_and_role(&store, OTHER_USER, OTHER_PASS, Role::User)?;
        create_user_with_password_and_role(&store, ADMIN_USER, ADMIN_PASS, Role::Admin)?;
    }

    let content_db_path = temp_dir.path().join("content.db");
    {
        let store = SqliteContentStore::new(&content_db_path)?;
        store.insert_game(&Game {
            id: GAME_1_ID.to_string(),
            title: GAME_1_TITLE.to_string(),
            genres: vec!["Adventure".to_string()],
            release_date: Some("2021-03-02".to_string()),
            platforms: vec!["PC".to_string()],
            description: Some("Deliver parcels between the stars.".to_string()),
            cover_image_url: None,
        })?;
        store.insert_game(&Game {
            id: GAME_2_ID.to_string(),
            title: GAME_2_TITLE.to_string(),
            genres: vec!["Roguelike".to_string()],
            release_date: Some("2019-11-20".to_string()),
            platforms: vec!["PC".to_string(), "Switch".to_string()],
            description: None,
            cover_image_url: None,
        })?;
    }

    Ok((temp_dir, users_db_path, content_db_path))
}

/// Creates an identity with the given credentials and role.
/// Returns the internal user id.
pub fn create_user_with_password_and_role(
    store: &SqliteUserStore,
    username: &str,
    password: &str,
    role: Role,
) -> Result<String> {
    let identity = store
        .create_identity(&UserIdentity::from_registration(username))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    store.set_role(&identity.id, role)?;
    store.upsert_credentials(UsernamePasswordCredentials::from_plain_password(
        &identity.id,
        password,
    )?)?;

    Ok(identity.id)
}
