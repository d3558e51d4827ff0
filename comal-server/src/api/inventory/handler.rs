//! Inventory movement handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use shared::models::{MovementWithProduct, Product};

use crate::core::ServerState;
use crate::db::repository::inventory;
use crate::utils::{AppResponse, AppResult, ok};

const DEFAULT_MOVEMENT_LIMIT: i64 = 100;
const MAX_MOVEMENT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    /// Window start, Unix ms inclusive
    pub from: Option<i64>,
    /// Window end, Unix ms inclusive
    pub to: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/inventory/movements - ledger, newest first
pub async fn movements(
    State(state): State<ServerState>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<AppResponse<Vec<MovementWithProduct>>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
        .clamp(1, MAX_MOVEMENT_LIMIT);
    let movements =
        inventory::find_movements(state.pool(), query.product_id, query.from, query.to, limit)
            .await?;
    Ok(ok(movements))
}

/// GET /api/inventory/low-stock - products at or below their threshold
pub async fn low_stock(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<Product>>>> {
    let products = inventory::low_stock(state.pool()).await?;
    Ok(ok(products))
}
