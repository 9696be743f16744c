//! End-to-end tests for user administration and the identity deletion
//! cascade.

mod common;

use common::{TestClient, TestServer, GAME_1_ID, GAME_1_TITLE};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn listing_all_users_requires_the_admin_role() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let response = client.get_all_users().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = admin.get_all_users().await;
    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<serde_json::Value> = response.json().await.unwrap();
    // testuser, otheruser and admin are seeded
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn get_user_by_id_and_unknown_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let user_id = client.own_user_id().await;

    let response = client.get_user(&user_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get_user("missing-user").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_update_is_self_or_admin_only() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let other = TestClient::authenticated_other(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let other_id = other.own_user_id().await;

    // A regular user cannot edit someone else
    let response = client
        .update_user(&other_id, json!({ "avatar_url": "https://x/y.png" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Self-edit works
    let user_id = client.own_user_id().await;
    let response = client
        .update_user(&user_id, json!({ "avatar_url": "https://x/me.png" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["avatar_url"], "https://x/me.png");

    // Admin edit of someone else works
    let response = admin
        .update_user(&other_id, json!({ "display_name": "renamed-other" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["display_name"], "renamed-other");
}

#[tokio::test]
async fn deleting_an_identity_cascades_to_owned_content() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let user_id = client.own_user_id().await;

    // The user owns a library entry, a note and a review
    client
        .library_add(
            &user_id,
            json!({ "game_id": "g1", "title": "Foo", "platforms": [] }),
        )
        .await;
    let response = client
        .create_note(json!({
            "game_id": GAME_1_ID,
            "game_title": GAME_1_TITLE,
            "title": "to be cascaded",
            "content": "x",
            "category": "misc"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = client
        .create_review(json!({
            "game_id": GAME_1_ID,
            "game_title": GAME_1_TITLE,
            "rating": 3.0,
            "content": "x",
            "date": "2024-06-01"
        }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = admin.delete_user(&user_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Identity, notes and reviews are gone; the session died with the user
    let response = admin.get_user(&user_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = admin.get_notes_by_user(&user_id).await;
    let notes: Vec<serde_json::Value> = response.json().await.unwrap();
    assert!(notes.is_empty());

    let response = admin.get_reviews_by_user(&user_id).await;
    let reviews: Vec<serde_json::Value> = response.json().await.unwrap();
    assert!(reviews.is_empty());

    let response = client.auth_me().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn a_user_cannot_delete_someone_else() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let other = TestClient::authenticated_other(server.base_url.clone()).await;
    let other_id = other.own_user_id().await;

    let response = client.delete_user(&other_id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = other.auth_me().await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn a_user_can_delete_their_own_account() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let user_id = client.own_user_id().await;

    let response = client.delete_user(&user_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.auth_me().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
