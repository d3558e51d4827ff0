//! Authentication and authorization scenarios
//!
//! Login goes through the real HTTP endpoint (including the fixed
//! processing delay); the protected-route checks mint tokens directly.

mod common;

use http::{Method, StatusCode};
use serde_json::json;
use shared::models::UserRole;

#[tokio::test]
async fn login_returns_token_and_profile() {
    let app = common::spawn_app().await;
    app.seed_user("Admin", "admin", UserRole::Admin).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "secret-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "E0000");

    let data = &body["data"];
    assert!(!data["token"].as_str().expect("token").is_empty());
    assert!(data["expires_in"].as_i64().expect("expires_in") > 0);
    assert_eq!(data["user"]["username"], "admin");
    assert_eq!(data["user"]["role"], "admin");
    // The profile never carries the password hash
    assert!(data["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_failures_share_one_error_message() {
    let app = common::spawn_app().await;
    app.seed_user("Admin", "admin", UserRole::Admin).await;

    let (status, wrong_password) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "not-the-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, unknown_user) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "nobody", "password": "whatever"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Neither the code nor the message reveals which part was wrong
    assert_eq!(wrong_password["code"], unknown_user["code"]);
    assert_eq!(wrong_password["message"], "Invalid username or password");
    assert_eq!(unknown_user["message"], "Invalid username or password");
}

#[tokio::test]
async fn deactivated_account_cannot_login() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    let (user_id, _) = app.seed_user("Cajero", "cajero", UserRole::Cajero).await;

    let (status, _) = app
        .put(
            &format!("/api/users/{user_id}"),
            &admin,
            json!({"is_active": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "cajero", "password": "secret-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid username or password");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = common::spawn_app().await;

    let (status, body) = app.request(Method::GET, "/api/mesas", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E3001");

    let (status, body) = app.get("/api/mesas", "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E3002");
}

#[tokio::test]
async fn admin_routes_reject_non_admin_roles() {
    let app = common::spawn_app().await;
    let mesero = app.mesero_token().await;

    let (status, body) = app.get("/api/users", &mesero).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "E2001");

    // Non-admin roles still reach the regular floor routes
    let (status, _) = app.get("/api/mesas", &mesero).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn me_returns_the_authenticated_profile() {
    let app = common::spawn_app().await;
    let (user_id, token) = app.seed_user("Mesero Uno", "mesero1", UserRole::Mesero).await;

    let (status, body) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id);
    assert_eq!(body["data"]["username"], "mesero1");
    assert_eq!(body["data"]["role"], "mesero");
}
