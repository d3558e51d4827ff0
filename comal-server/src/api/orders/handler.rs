//! Order lifecycle handlers
//!
//! Stock decrement/restore and mesa occupation run inside the order
//! repository transactions. Handlers fetch the pre-mutation detail only
//! to feed the audit diff.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::models::{
    OrderCancel, OrderCreate, OrderDetail, OrderItem, OrderItemCancel, OrderItemStatusUpdate,
    OrderList, OrderPay, OrderQuery,
};

use crate::audit::AuditAction;
use crate::audit::diff::{create_diff, create_snapshot};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::order;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// GET /api/orders - active orders plus filtered history
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<AppResponse<OrderList>>> {
    let orders = order::find_all(state.pool(), &query).await?;
    Ok(ok(orders))
}

/// GET /api/orders/{id} - full detail with items and payments
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    let detail = order::find_detail(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    Ok(ok(detail))
}

/// POST /api/orders - open an order on a mesa
pub async fn create(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;
    for line in &payload.items {
        validate_optional_text(&line.note, "item note", MAX_NOTE_LEN)?;
    }

    let detail = order::create(
        state.pool(),
        &payload,
        current.id,
        state.config.stock_control,
    )
    .await?;

    audit_log!(
        state,
        AuditAction::OrderCreated,
        "orders",
        detail.order.id,
        current,
        None,
        Some(create_snapshot(&detail, "orders")),
    );
    Ok(ok(detail))
}

/// POST /api/orders/{id}/pay - settle, single payment or splits
pub async fn pay(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderPay>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    let old = order::find_detail(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;

    let detail = order::pay(state.pool(), id, &payload).await?;

    audit_log!(
        state,
        AuditAction::OrderPaid,
        "orders",
        id,
        current,
        Some(create_snapshot(&old, "orders")),
        Some(create_diff(&old, &detail, "orders")),
    );
    Ok(ok(detail))
}

/// POST /api/orders/{id}/cancel - cancel and restore stock
pub async fn cancel(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderCancel>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    validate_optional_text(&payload.note, "note", MAX_NOTE_LEN)?;

    let old = order::find_detail(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;

    let detail = order::cancel(
        state.pool(),
        id,
        &payload,
        current.id,
        state.config.stock_control,
    )
    .await?;

    audit_log!(
        state,
        AuditAction::OrderCancelled,
        "orders",
        id,
        current,
        Some(create_snapshot(&old, "orders")),
        Some(create_diff(&old, &detail, "orders")),
    );
    Ok(ok(detail))
}

/// PUT /api/orders/{id}/items/{item_id}/status - kitchen flow step
pub async fn update_item_status(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<OrderItemStatusUpdate>,
) -> AppResult<Json<AppResponse<OrderItem>>> {
    let old_item = find_item(&state, id, item_id).await?;

    let updated = order::update_item_status(state.pool(), id, item_id, payload.status).await?;

    audit_log!(
        state,
        AuditAction::OrderItemStatusChanged,
        "order_items",
        item_id,
        current,
        Some(create_snapshot(&old_item, "order_items")),
        Some(create_diff(&old_item, &updated, "order_items")),
    );
    Ok(ok(updated))
}

/// DELETE /api/orders/{id}/items/{item_id} - cancel one line
pub async fn cancel_item(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<OrderItemCancel>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;

    let old_item = find_item(&state, id, item_id).await?;

    let detail = order::cancel_item(
        state.pool(),
        id,
        item_id,
        &payload,
        current.id,
        state.config.stock_control,
    )
    .await?;

    let new_item = detail.items.iter().find(|i| i.id == item_id);
    audit_log!(
        state,
        AuditAction::OrderItemCancelled,
        "order_items",
        item_id,
        current,
        Some(create_snapshot(&old_item, "order_items")),
        new_item.map(|item| create_diff(&old_item, item, "order_items")),
    );
    Ok(ok(detail))
}

async fn find_item(state: &ServerState, order_id: i64, item_id: i64) -> AppResult<OrderItem> {
    let detail = order::find_detail(state.pool(), order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;
    detail
        .items
        .into_iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| {
            AppError::not_found(format!("Item {item_id} not found in order {order_id}"))
        })
}
