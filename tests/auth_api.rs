mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn register_then_login_yields_usable_token() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/login/",
            None,
            Some(json!({ "username": "alice", "password": "s3cret-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let (status, _) = app.get("/collection/", token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, body) = app
        .call(Method::POST, "/login/", None, Some(json!({ "username": "alice", "password": "nope" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password");

    let (status, _) = app
        .call(Method::POST, "/login/", None, Some(json!({ "username": "bob", "password": "nope" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/register/",
            None,
            Some(json!({ "username": "alice", "password": "another-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"], json!(["A user with that username already exists."]));
}

#[tokio::test]
async fn blank_credentials_are_field_errors() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::POST, "/register/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
    assert!(body["password"].is_array());
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/collection/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication credentials were not provided.");

    let (status, body) = app.get("/request-count/", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Given token not valid or expired.");

    let (status, _) = app.get("/movies/", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let app = TestApp::new().await;
    let forged = reelshelf::auth::JwtKeys::new("some-other-secret", 5).issue(1, "alice").unwrap();

    let (status, _) = app.get("/collection/", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
