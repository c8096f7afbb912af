//! Registration and bearer-token authentication behavior.

mod common;

use axum::http::StatusCode;
use common::{response_json, setup_app};
use serde_json::json;

#[tokio::test]
async fn register_returns_a_usable_token() {
    let app = setup_app();

    let response = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "parent@example.com"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["email"], "parent@example.com");
    let token = body["auth_token"].as_str().unwrap().to_string();

    // The token authenticates a protected route.
    let response = app
        .request("GET", "/api/me/credentials", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let status = response_json(response).await;
    assert_eq!(status["text"], false);
    assert_eq!(status["speech"], false);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = setup_app();
    app.seed_user("parent@example.com");

    let response = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "parent@example.com"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = setup_app();

    let response = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "not-an-email"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = setup_app();

    let response = app.request("GET", "/api/stories", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", "/api/stories", Some("bogus-token"), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = setup_app();
    let response = app.request("GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn stored_credentials_report_true_without_leaking_bytes() {
    let app = setup_app();
    let user = app.seed_user("parent@example.com");

    let response = app
        .request(
            "PUT",
            "/api/me/credentials/speech",
            Some(&user.auth_token),
            Some(json!({"api_key": "hume-key-123"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request("GET", "/api/me/credentials", Some(&user.auth_token), None)
        .await;
    let status = response_json(response).await;
    assert_eq!(status["speech"], true);
    assert_eq!(status["text"], false);
    assert!(status.get("api_key").is_none());

    // At rest the key is ciphertext, not plaintext.
    let conn = app.pool.get().unwrap();
    let stored: Vec<u8> = conn
        .query_row(
            "SELECT speech_key_ciphertext FROM users WHERE id = ?1",
            [&user.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_ne!(stored, b"hume-key-123".to_vec());
}
