//! End-to-end tests for the local game catalog and the cached RAWG
//! pass-through.

mod common;

use common::{spawn_rawg_stub, TestClient, TestServer, GAME_1_ID, GAME_1_TITLE, GAME_2_ID};
use reqwest::StatusCode;
use serde_json::json;

fn game_payload(title: &str) -> serde_json::Value {
    json!({
        "title": title,
        "genres": ["RPG"],
        "release_date": "2015-05-19",
        "platforms": ["PC"],
        "description": "an rpg",
        "cover_image_url": null
    })
}

// =============================================================================
// Local catalog
// =============================================================================

#[tokio::test]
async fn lists_seeded_games() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_all_games().await;
    assert_eq!(response.status(), StatusCode::OK);
    let games: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(games.len(), 2);

    let response = client.get_game(GAME_1_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    let game: serde_json::Value = response.json().await.unwrap();
    assert_eq!(game["title"], GAME_1_TITLE);
}

#[tokio::test]
async fn get_unknown_game_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_game("missing-game").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_can_create_update_and_delete_games() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let response = admin.add_game(game_payload("The Witcher 3")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let game: serde_json::Value = response.json().await.unwrap();
    let game_id = game["id"].as_str().unwrap();

    let response = admin
        .update_game(game_id, game_payload("The Witcher 3 GOTY"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["title"], "The Witcher 3 GOTY");

    let response = admin.delete_game(game_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = admin.get_game(game_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_mutation_requires_the_admin_role() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.add_game(game_payload("Not Allowed")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.update_game(GAME_1_ID, game_payload("Nope")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.delete_game(GAME_2_ID).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Nothing changed
    let response = client.get_game(GAME_2_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// RAWG pass-through
// =============================================================================

#[tokio::test]
async fn rawg_fetch_maps_results_to_the_local_shape() {
    let stub = spawn_rawg_stub().await;
    let server = TestServer::spawn_with_rawg(&stub.base_url).await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.fetch_rawg_games(None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let list: serde_json::Value = response.json().await.unwrap();
    let games = list["games"].as_array().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["id"], "3498");
    assert_eq!(games[0]["title"], "Grand Theft Auto V");
    assert_eq!(games[0]["genres"][0], "Action");
    assert_eq!(games[0]["platforms"][0], "PC");
}

#[tokio::test]
async fn repeated_rawg_fetch_with_same_key_hits_the_cache() {
    let stub = spawn_rawg_stub().await;
    let server = TestServer::spawn_with_rawg(&stub.base_url).await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.fetch_rawg_games(Some("1"), Some("zelda")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.list_request_count(), 1);

    // Same query parameters: served from the cache, the stub sees nothing
    let response = client.fetch_rawg_games(Some("1"), Some("zelda")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.list_request_count(), 1);

    // A different key misses
    let response = client.fetch_rawg_games(Some("2"), Some("zelda")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.list_request_count(), 2);
}

#[tokio::test]
async fn rawg_detail_is_cached_by_game_id() {
    let stub = spawn_rawg_stub().await;
    let server = TestServer::spawn_with_rawg(&stub.base_url).await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.fetch_rawg_game_detail("3498").await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail: serde_json::Value = response.json().await.unwrap();
    assert_eq!(detail["id"], 3498);
    assert_eq!(stub.detail_request_count(), 1);

    let response = client.fetch_rawg_game_detail("3498").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.detail_request_count(), 1);

    let response = client.fetch_rawg_game_detail("1234").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.detail_request_count(), 2);
}

#[tokio::test]
async fn rawg_fetch_without_a_configured_client_is_unavailable() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.fetch_rawg_games(None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client.fetch_rawg_game_detail("3498").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn rawg_fetch_requires_authentication() {
    let stub = spawn_rawg_stub().await;
    let server = TestServer::spawn_with_rawg(&stub.base_url).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.fetch_rawg_games(None, None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(stub.list_request_count(), 0);
}
