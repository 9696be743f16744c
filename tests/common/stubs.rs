//! Stub upstream services (RAWG API, GitHub OAuth endpoints)
//!
//! Each stub binds a real listener on a random port so the server under test
//! talks actual HTTP to it. Request counters let tests assert on cache
//! behavior (a cache hit never reaches the stub).

use super::constants::*;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct RawgStubState {
    list_requests: Arc<AtomicUsize>,
    detail_requests: Arc<AtomicUsize>,
}

pub struct RawgStub {
    pub base_url: String,
    list_requests: Arc<AtomicUsize>,
    detail_requests: Arc<AtomicUsize>,
}

impl RawgStub {
    pub fn list_request_count(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    pub fn detail_request_count(&self) -> usize {
        self.detail_requests.load(Ordering::SeqCst)
    }
}

async fn rawg_stub_list(State(state): State<RawgStubState>) -> Json<serde_json::Value> {
    state.list_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "next": null,
        "previous": null,
        "results": [{
            "id": 3498,
            "name": "Grand Theft Auto V",
            "released": "2013-09-17",
            "background_image": "https://media.rawg.io/gta5.jpg",
            "genres": [{"name": "Action"}],
            "platforms": [{"platform": {"name": "PC"}}]
        }]
    }))
}

async fn rawg_stub_detail(
    State(state): State<RawgStubState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    state.detail_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "id": id.parse::<i64>().unwrap_or(0),
        "name": "Grand Theft Auto V",
        "description": "An open world game.",
        "released": "2013-09-17",
        "background_image": "https://media.rawg.io/gta5.jpg",
        "genres": [{"name": "Action"}],
        "platforms": [{"platform": {"name": "PC"}}]
    }))
}

/// Spawns a stub RAWG API on a random port.
pub async fn spawn_rawg_stub() -> RawgStub {
    let state = RawgStubState {
        list_requests: Arc::new(AtomicUsize::new(0)),
        detail_requests: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/api/games", get(rawg_stub_list))
        .route("/api/games/{id}", get(rawg_stub_detail))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind RAWG stub");
    let base_url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    RawgStub {
        base_url,
        list_requests: state.list_requests,
        detail_requests: state.detail_requests,
    }
}

async fn github_stub_token() -> Json<serde_json::Value> {
    Json(json!({
        "access_token": "stub-access-token",
        "token_type": "bearer",
        "scope": "read:user"
    }))
}

async fn github_stub_profile() -> Json<serde_json::Value> {
    Json(json!({
        "id": GITHUB_STUB_ID,
        "login": GITHUB_STUB_LOGIN,
        "avatar_url": "https://avatars.example.com/octocat.png"
    }))
}

pub struct GithubStub {
    pub base_url: String,
}

/// Spawns stub GitHub token and profile endpoints on a random port.
pub async fn spawn_github_stub() -> GithubStub {
    let app = Router::new()
        .route("/login/oauth/access_token", post(github_stub_token))
        .route("/user", get(github_stub_profile));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind GitHub stub");
    let base_url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    GithubStub { base_url }
}
