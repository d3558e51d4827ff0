//! Audit trail scenarios
//!
//! Mutations flow through the async worker, so assertions poll until
//! the expected number of entries is flushed before querying.

mod common;

use http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn mutations_append_chained_entries() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .post("/api/mesas", &admin, json!({"number": 12, "capacity": 4}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post(
            "/api/products",
            &admin,
            json!({"name": "Taco de canasta", "price": 15.0, "category": "tacos", "stock": 40}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.wait_for_audit(2).await;

    let (status, body) = app.get("/api/audit?action=mesa_created", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    let entry = &items[0];
    assert_eq!(entry["action"], "mesa_created");
    assert_eq!(entry["table_name"], "mesas");
    assert_eq!(entry["operator_name"], "admin");
    assert!(entry["before_snapshot"].is_null());
    assert_eq!(entry["after_snapshot"]["number"], 12);
    assert!(!entry["curr_hash"].as_str().expect("curr_hash").is_empty());

    // Oldest entry anchors the chain at the genesis marker
    let (_, all) = app.get("/api/audit?limit=500", &admin).await;
    let items = all["data"]["items"].as_array().expect("items");
    let oldest = items.last().expect("at least one entry");
    assert_eq!(oldest["prev_hash"], "genesis");
}

#[tokio::test]
async fn failed_login_is_audited_without_operator() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "ghost", "password": "whatever"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.wait_for_audit(1).await;

    let (_, body) = app.get("/api/audit?action=login_failed", &admin).await;
    let items = body["data"]["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    let entry = &items[0];
    assert_eq!(entry["table_name"], "users");
    assert_eq!(entry["row_id"], "ghost");
    assert!(entry["operator_id"].is_null());
    assert_eq!(entry["after_snapshot"]["reason"], "unknown_username");
}

#[tokio::test]
async fn update_entries_carry_before_and_after() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    let product_id = app.seed_product("Consome", 20.0, 10).await;

    let (status, _) = app
        .post(
            &format!("/api/products/{product_id}/stock"),
            &admin,
            json!({"delta": 15, "reason": "weekly delivery"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.wait_for_audit(1).await;

    let (_, body) = app.get("/api/audit?action=stock_adjusted", &admin).await;
    let entry = &body["data"]["items"].as_array().expect("items")[0];
    assert_eq!(entry["before_snapshot"]["stock"], 10);
    assert_eq!(entry["after_snapshot"]["delta"], 15);
    assert_eq!(entry["after_snapshot"]["stock_after"], 25);
    assert_eq!(entry["after_snapshot"]["reason"], "weekly delivery");
}

#[tokio::test]
async fn verify_reports_an_intact_chain() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;

    for number in 1..=3 {
        let (status, _) = app
            .post("/api/mesas", &admin, json!({"number": number}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    app.wait_for_audit(3).await;

    let (status, body) = app.get("/api/audit/verify", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["chain_intact"], true);
    assert!(data["total_entries"].as_i64().expect("total") >= 3);
    assert_eq!(data["breaks"].as_array().expect("breaks").len(), 0);
}

#[tokio::test]
async fn audit_routes_are_admin_only() {
    let app = common::spawn_app().await;
    let mesero = app.mesero_token().await;

    let (status, body) = app.get("/api/audit", &mesero).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "E2001");

    let (status, _) = app.get("/api/audit/verify", &mesero).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
