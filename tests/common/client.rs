//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all gamehub-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as the regular test user
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the second regular test user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_USER, OTHER_PASS).await
    }

    /// Creates a client pre-authenticated as the admin test user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    /// Creates a client pre-authenticated with the given credentials
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_as(base_url: String, username: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    /// Returns the caller's own user id via /api/users/me
    pub async fn own_user_id(&self) -> String {
        let response = self.users_me().await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let me: serde_json::Value = response.json().await.unwrap();
        me["id"].as_str().unwrap().to_string()
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/auth/register
    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/api/auth/register", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /api/auth/login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /api/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/api/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /api/auth/me
    pub async fn auth_me(&self) -> Response {
        self.client
            .get(format!("{}/api/auth/me", self.base_url))
            .send()
            .await
            .expect("Auth me request failed")
    }

    // ========================================================================
    // User & Library Endpoints
    // ========================================================================

    /// GET /api/users
    pub async fn get_all_users(&self) -> Response {
        self.client
            .get(format!("{}/api/users", self.base_url))
            .send()
            .await
            .expect("Get users request failed")
    }

    /// GET /api/users/me
    pub async fn users_me(&self) -> Response {
        self.client
            .get(format!("{}/api/users/me", self.base_url))
            .send()
            .await
            .expect("Users me request failed")
    }

    /// GET /api/users/{id}
    pub async fn get_user(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/api/users/{}", self.base_url, id))
            .send()
            .await
            .expect("Get user request failed")
    }

    /// PUT /api/users/{id}
    pub async fn update_user(&self, id: &str, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/api/users/{}", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Update user request failed")
    }

    /// DELETE /api/users/{id}
    pub async fn delete_user(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/api/users/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete user request failed")
    }

    /// PUT /api/users/{id}/library/add
    pub async fn library_add(&self, id: &str, entry: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/api/users/{}/library/add", self.base_url, id))
            .json(&entry)
            .send()
            .await
            .expect("Library add request failed")
    }

    /// PUT /api/users/{id}/library/remove
    pub async fn library_remove(&self, id: &str, game_id: &str) -> Response {
        self.client
            .put(format!(
                "{}/api/users/{}/library/remove",
                self.base_url, id
            ))
            .json(&json!({ "game_id": game_id }))
            .send()
            .await
            .expect("Library remove request failed")
    }

    // ========================================================================
    // Game Endpoints
    // ========================================================================

    /// GET /api/games
    pub async fn get_all_games(&self) -> Response {
        self.client
            .get(format!("{}/api/games", self.base_url))
            .send()
            .await
            .expect("Get games request failed")
    }

    /// GET /api/games/{id}
    pub async fn get_game(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/api/games/{}", self.base_url, id))
            .send()
            .await
            .expect("Get game request failed")
    }

    /// POST /api/games
    pub async fn add_game(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/api/games", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Add game request failed")
    }

    /// PUT /api/games/{id}
    pub async fn update_game(&self, id: &str, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/api/games/{}", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Update game request failed")
    }

    /// DELETE /api/games/{id}
    pub async fn delete_game(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/api/games/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete game request failed")
    }

    /// GET /api/games/fetch?page&search
    pub async fn fetch_rawg_games(&self, page: Option<&str>, search: Option<&str>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/api/games/fetch", self.base_url));
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(search) = search {
            request = request.query(&[("search", search)]);
        }
        request.send().await.expect("RAWG fetch request failed")
    }

    /// GET /api/games/fetch/{id}
    pub async fn fetch_rawg_game_detail(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/api/games/fetch/{}", self.base_url, id))
            .send()
            .await
            .expect("RAWG detail request failed")
    }

    // ========================================================================
    // Note Endpoints
    // ========================================================================

    /// GET /api/notes
    pub async fn get_all_notes(&self) -> Response {
        self.client
            .get(format!("{}/api/notes", self.base_url))
            .send()
            .await
            .expect("Get notes request failed")
    }

    /// GET /api/notes/{id}
    pub async fn get_note(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/api/notes/{}", self.base_url, id))
            .send()
            .await
            .expect("Get note request failed")
    }

    /// GET /api/notes/user/{user_id}
    pub async fn get_notes_by_user(&self, user_id: &str) -> Response {
        self.client
            .get(format!("{}/api/notes/user/{}", self.base_url, user_id))
            .send()
            .await
            .expect("Get notes by user request failed")
    }

    /// POST /api/notes
    pub async fn create_note(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/api/notes", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Create note request failed")
    }

    /// PUT /api/notes/{id}
    pub async fn update_note(&self, id: &str, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/api/notes/{}", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Update note request failed")
    }

    /// DELETE /api/notes/{id}
    pub async fn delete_note(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/api/notes/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete note request failed")
    }

    // ========================================================================
    // Review Endpoints
    // ========================================================================

    /// GET /api/reviews
    pub async fn get_all_reviews(&self) -> Response {
        self.client
            .get(format!("{}/api/reviews", self.base_url))
            .send()
            .await
            .expect("Get reviews request failed")
    }

    /// GET /api/reviews/{game_id}
    pub async fn get_reviews_by_game(&self, game_id: &str) -> Response {
        self.client
            .get(format!("{}/api/reviews/{}", self.base_url, game_id))
            .send()
            .await
            .expect("Get reviews by game request failed")
    }

    /// GET /api/reviews/user/{user_id}
    pub async fn get_reviews_by_user(&self, user_id: &str) -> Response {
        self.client
            .get(format!("{}/api/reviews/user/{}", self.base_url, user_id))
            .send()
            .await
            .expect("Get reviews by user request failed")
    }

    /// POST /api/reviews
    pub async fn create_review(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/api/reviews", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Create review request failed")
    }

    /// PUT /api/reviews/{id}
    pub async fn update_review(&self, id: &str, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/api/reviews/{}", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Update review request failed")
    }

    /// DELETE /api/reviews/{id}
    pub async fn delete_review(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/api/reviews/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete review request failed")
    }
}
