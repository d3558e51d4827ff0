//! Catalog edge cases, inventory guard rails and the dashboard rollup

mod common;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn duplicate_mesa_number_conflicts() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    app.seed_mesa(9).await;

    let (status, body) = app
        .post("/api/mesas", &admin, json!({"number": 9}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");
}

#[tokio::test]
async fn product_name_is_required() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/products",
            &admin,
            json!({"name": "   ", "price": 10.0, "category": "tacos"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");
}

#[tokio::test]
async fn stock_update_goes_through_the_adjustment_route() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    let product_id = app.seed_product("Salsa verde", 10.0, 8).await;

    // The generic update route ignores stock entirely
    let (status, updated) = app
        .put(
            &format!("/api/products/{product_id}"),
            &admin,
            json!({"price": 12.0}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["stock"], 8);
    assert_eq!(updated["data"]["price"], 12.0);

    // An adjustment below the floor is rejected atomically
    let (status, body) = app
        .post(
            &format!("/api/products/{product_id}/stock"),
            &admin,
            json!({"delta": -20, "reason": "spillage"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");

    let (_, product) = app.get(&format!("/api/products/{product_id}"), &admin).await;
    assert_eq!(product["data"]["stock"], 8);

    // A correction keeps the signed delta under ADJUSTMENT
    let (status, _) = app
        .post(
            &format!("/api/products/{product_id}/stock"),
            &admin,
            json!({"delta": -3, "reason": "count correction"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, movements) = app
        .get(
            &format!("/api/inventory/movements?product_id={product_id}"),
            &admin,
        )
        .await;
    let rows = movements["data"].as_array().expect("movement list");
    let adjustment = rows
        .iter()
        .find(|m| m["movement_type"] == "ADJUSTMENT")
        .expect("adjustment row");
    assert_eq!(adjustment["quantity"], -3);
}

#[tokio::test]
async fn low_stock_lists_products_at_their_threshold() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    app.seed_product("Tortillas", 5.0, 100).await;
    let low = app.seed_product("Cebolla", 8.0, 4).await;

    let (status, body) = app.get("/api/inventory/low-stock", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().expect("low stock list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], low);
}

#[tokio::test]
async fn dashboard_rolls_up_the_day() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    let pastor = app.seed_product("Taco al pastor", 25.0, 100).await;
    let quesadilla = app.seed_product("Quesadilla", 30.0, 100).await;
    let mesa_a = app.seed_mesa(1).await;
    let mesa_b = app.seed_mesa(2).await;
    let mesa_c = app.seed_mesa(3).await;

    // Paid order: 2 x 25 = 50
    let (_, created) = app
        .post(
            "/api/orders",
            &admin,
            json!({"mesa_id": mesa_a, "items": [{"product_id": pastor, "quantity": 2}]}),
        )
        .await;
    let paid_id = created["data"]["id"].as_i64().expect("order id");
    let (status, _) = app
        .post(
            &format!("/api/orders/{paid_id}/pay"),
            &admin,
            json!({"method": "tarjeta"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Cancelled order
    let (_, created) = app
        .post(
            "/api/orders",
            &admin,
            json!({"mesa_id": mesa_b, "items": [{"product_id": quesadilla, "quantity": 1}]}),
        )
        .await;
    let cancelled_id = created["data"]["id"].as_i64().expect("order id");
    let (status, _) = app
        .post(
            &format!("/api/orders/{cancelled_id}/cancel"),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Still-open order
    let (status, _) = app
        .post(
            "/api/orders",
            &admin,
            json!({"mesa_id": mesa_c, "items": [{"product_id": pastor, "quantity": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/statistics/dashboard", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["revenue_today"], 50.0);
    assert_eq!(data["paid_orders_today"], 1);
    assert_eq!(data["cancelled_orders_today"], 1);
    assert_eq!(data["active_orders"], 1);
    assert_eq!(data["average_ticket"], 50.0);

    // Only lines of paid orders rank; active and cancelled ones do not
    let top = data["top_products"].as_array().expect("top products");
    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["product_name"], "Taco al pastor");
    assert_eq!(top[0]["quantity"], 2);
}
