//! End-to-end order lifecycle scenarios
//!
//! Each test drives the HTTP surface against a fresh tempdir database:
//! stock decrement on create, restoration on cancel, payment splits,
//! mesa occupancy and the guard rails around terminal states.

mod common;

use http::StatusCode;
use serde_json::{Value, json};

async fn create_order(
    app: &common::TestApp,
    token: &str,
    mesa_id: i64,
    product_id: i64,
    quantity: i64,
) -> (StatusCode, Value) {
    app.post(
        "/api/orders",
        token,
        json!({
            "mesa_id": mesa_id,
            "diners": 2,
            "items": [{"product_id": product_id, "quantity": quantity, "note": null}],
            "note": null
        }),
    )
    .await
}

#[tokio::test]
async fn create_decrements_stock_and_occupies_mesa() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Taco al pastor", 25.0, 100).await;
    let mesa_id = app.seed_mesa(1).await;

    let (status, body) = create_order(&app, &token, mesa_id, product_id, 3).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "ACTIVE");
    assert_eq!(data["total"], 75.0);
    assert_eq!(data["items"][0]["product_name"], "Taco al pastor");
    assert_eq!(data["items"][0]["unit_price"], 25.0);
    assert_eq!(data["items"][0]["status"], "PENDING");

    let (_, product) = app.get(&format!("/api/products/{product_id}"), &token).await;
    assert_eq!(product["data"]["stock"], 97);

    let (_, mesa) = app.get(&format!("/api/mesas/{mesa_id}"), &token).await;
    assert_eq!(mesa["data"]["status"], "OCCUPIED");
    assert_eq!(mesa["data"]["current_order_id"], data["id"]);

    let (_, movements) = app
        .get(
            &format!("/api/inventory/movements?product_id={product_id}"),
            &token,
        )
        .await;
    let rows = movements["data"].as_array().expect("movement list");
    let outflow = rows
        .iter()
        .find(|m| m["reason"] == "order")
        .expect("order outflow recorded");
    assert_eq!(outflow["movement_type"], "OUTFLOW");
    assert_eq!(outflow["quantity"], 3);
    assert_eq!(outflow["order_id"], data["id"]);
}

#[tokio::test]
async fn pay_single_method_frees_mesa() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Quesadilla", 30.0, 50).await;
    let mesa_id = app.seed_mesa(2).await;

    let (_, created) = create_order(&app, &token, mesa_id, product_id, 2).await;
    let order_id = created["data"]["id"].as_i64().expect("order id");

    let (status, paid) = app
        .post(
            &format!("/api/orders/{order_id}/pay"),
            &token,
            json!({"method": "efectivo"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["data"]["status"], "PAID");
    assert_eq!(paid["data"]["payment_method"], "efectivo");
    assert!(paid["data"]["closed_at"].is_i64());

    let (_, mesa) = app.get(&format!("/api/mesas/{mesa_id}"), &token).await;
    assert_eq!(mesa["data"]["status"], "AVAILABLE");
    assert!(mesa["data"]["current_order_id"].is_null());
}

#[tokio::test]
async fn split_payment_must_sum_to_total() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Taco de suadero", 25.0, 50).await;
    let mesa_id = app.seed_mesa(3).await;

    let (_, created) = create_order(&app, &token, mesa_id, product_id, 3).await;
    let order_id = created["data"]["id"].as_i64().expect("order id");

    // 40 + 30 != 75: rejected, order stays active
    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/pay"),
            &token,
            json!({"splits": [
                {"diner_index": 1, "amount": 40.0, "method": "tarjeta"},
                {"diner_index": 2, "amount": 30.0, "method": "efectivo"}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E0002");

    let (_, detail) = app.get(&format!("/api/orders/{order_id}"), &token).await;
    assert_eq!(detail["data"]["status"], "ACTIVE");

    let (status, paid) = app
        .post(
            &format!("/api/orders/{order_id}/pay"),
            &token,
            json!({"splits": [
                {"diner_index": 1, "amount": 40.0, "method": "tarjeta"},
                {"diner_index": 2, "amount": 35.0, "method": "efectivo"}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["data"]["status"], "PAID");
    // Headline method on the order row is the first split's
    assert_eq!(paid["data"]["payment_method"], "tarjeta");
    let payments = paid["data"]["payments"].as_array().expect("payments");
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0]["diner_index"], 1);
    assert_eq!(payments[0]["amount"], 40.0);
    assert_eq!(payments[1]["method"], "efectivo");
}

#[tokio::test]
async fn cancel_restores_stock_and_rejects_further_payment() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Gringa", 45.0, 20).await;
    let mesa_id = app.seed_mesa(4).await;

    let (_, created) = create_order(&app, &token, mesa_id, product_id, 4).await;
    let order_id = created["data"]["id"].as_i64().expect("order id");

    let (status, cancelled) = app
        .post(
            &format!("/api/orders/{order_id}/cancel"),
            &token,
            json!({"note": "customer left"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status"], "CANCELLED");

    let (_, product) = app.get(&format!("/api/products/{product_id}"), &token).await;
    assert_eq!(product["data"]["stock"], 20);

    let (_, movements) = app
        .get(
            &format!("/api/inventory/movements?product_id={product_id}"),
            &token,
        )
        .await;
    let rows = movements["data"].as_array().expect("movement list");
    let inflow = rows
        .iter()
        .find(|m| m["reason"] == "cancellation")
        .expect("restoration inflow recorded");
    assert_eq!(inflow["movement_type"], "INFLOW");
    assert_eq!(inflow["quantity"], 4);

    let (_, mesa) = app.get(&format!("/api/mesas/{mesa_id}"), &token).await;
    assert_eq!(mesa["data"]["status"], "AVAILABLE");

    // Terminal state: paying a cancelled order is a business rule error
    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/pay"),
            &token,
            json!({"method": "efectivo"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Taco de barbacoa", 35.0, 2).await;
    let mesa_id = app.seed_mesa(5).await;

    let (status, body) = create_order(&app, &token, mesa_id, product_id, 5).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");

    let (_, product) = app.get(&format!("/api/products/{product_id}"), &token).await;
    assert_eq!(product["data"]["stock"], 2);

    let (_, mesa) = app.get(&format!("/api/mesas/{mesa_id}"), &token).await;
    assert_eq!(mesa["data"]["status"], "AVAILABLE");
    assert!(mesa["data"]["current_order_id"].is_null());

    let (_, orders) = app.get("/api/orders", &token).await;
    assert_eq!(orders["data"]["active"].as_array().expect("active").len(), 0);
}

#[tokio::test]
async fn occupied_mesa_rejects_second_order() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Agua de horchata", 20.0, 50).await;
    let mesa_id = app.seed_mesa(6).await;

    let (status, _) = create_order(&app, &token, mesa_id, product_id, 1).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = create_order(&app, &token, mesa_id, product_id, 1).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");
}

#[tokio::test]
async fn cancel_item_restores_stock_and_recomputes_total() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let tacos = app.seed_product("Taco de pollo", 22.0, 30).await;
    let refresco = app.seed_product("Refresco", 18.0, 30).await;
    let mesa_id = app.seed_mesa(7).await;

    let (status, created) = app
        .post(
            "/api/orders",
            &token,
            json!({
                "mesa_id": mesa_id,
                "diners": 2,
                "items": [
                    {"product_id": tacos, "quantity": 3, "note": null},
                    {"product_id": refresco, "quantity": 2, "note": null}
                ],
                "note": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["data"]["total"], 102.0);
    let order_id = created["data"]["id"].as_i64().expect("order id");
    let drink_item = created["data"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .find(|i| i["product_id"] == refresco)
        .expect("drink line")["id"]
        .as_i64()
        .expect("item id");

    let (status, detail) = app
        .delete(
            &format!("/api/orders/{order_id}/items/{drink_item}"),
            &token,
            json!({"reason": "out of ice"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"]["total"], 66.0);
    let cancelled_line = detail["data"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .find(|i| i["id"] == drink_item)
        .expect("cancelled line");
    assert_eq!(cancelled_line["is_cancelled"], true);

    let (_, product) = app.get(&format!("/api/products/{refresco}"), &token).await;
    assert_eq!(product["data"]["stock"], 30);

    let (_, movements) = app
        .get(
            &format!("/api/inventory/movements?product_id={refresco}"),
            &token,
        )
        .await;
    let rows = movements["data"].as_array().expect("movement list");
    assert!(rows.iter().any(|m| m["reason"] == "item_cancellation"));
}

#[tokio::test]
async fn line_status_only_moves_forward() {
    let app = common::spawn_app().await;
    let token = app.admin_token().await;
    let product_id = app.seed_product("Sopes", 28.0, 15).await;
    let mesa_id = app.seed_mesa(8).await;

    let (_, created) = create_order(&app, &token, mesa_id, product_id, 1).await;
    let order_id = created["data"]["id"].as_i64().expect("order id");
    let item_id = created["data"]["items"][0]["id"].as_i64().expect("item id");

    let uri = format!("/api/orders/{order_id}/items/{item_id}/status");
    let (status, updated) = app.put(&uri, &token, json!({"status": "IN_PREPARATION"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["status"], "IN_PREPARATION");

    let (status, updated) = app.put(&uri, &token, json!({"status": "DELIVERED"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["status"], "DELIVERED");

    // Backwards transition is rejected
    let (status, body) = app.put(&uri, &token, json!({"status": "PENDING"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E0005");
}
