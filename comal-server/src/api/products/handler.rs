//! Product catalog handlers
//!
//! Stock is never edited through the generic update route; every stock
//! change goes through the adjustment endpoint so the movement ledger
//! stays complete.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{Product, ProductCreate, ProductUpdate, StockAdjust};

use crate::audit::AuditAction;
use crate::audit::diff::{create_diff, create_snapshot};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{inventory, product};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, MAX_URL_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityUpdate {
    pub is_available: bool,
}

/// GET /api/products - catalog, optionally filtered by category
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<AppResponse<Vec<Product>>>> {
    let products = product::find_all(
        state.pool(),
        query.category.as_deref(),
        query.available_only,
    )
    .await?;
    Ok(ok(products))
}

/// GET /api/products/categories - distinct category names
pub async fn categories(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<String>>>> {
    let categories = product::categories(state.pool()).await?;
    Ok(ok(categories))
}

/// GET /api/products/{id} - single product
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<Product>>> {
    let found = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;
    Ok(ok(found))
}

/// POST /api/products - create a product
///
/// A non-zero initial stock is recorded as an "initial stock" inflow in
/// the movement ledger by the repository.
pub async fn create(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<AppResponse<Product>>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&payload.category, "category", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.code, "code", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.image_url, "image_url", MAX_URL_LEN)?;

    let created = product::create(state.pool(), &payload, Some(current.id)).await?;

    audit_log!(
        state,
        AuditAction::ProductCreated,
        "products",
        created.id,
        current,
        None,
        Some(create_snapshot(&created, "products")),
    );
    Ok(ok(created))
}

/// PUT /api/products/{id} - update catalog fields (not stock)
pub async fn update(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<AppResponse<Product>>> {
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.code, "code", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.image_url, "image_url", MAX_URL_LEN)?;

    let old = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;

    let updated = product::update(state.pool(), id, &payload).await?;

    audit_log!(
        state,
        AuditAction::ProductUpdated,
        "products",
        id,
        current,
        Some(create_snapshot(&old, "products")),
        Some(create_diff(&old, &updated, "products")),
    );
    Ok(ok(updated))
}

/// DELETE /api/products/{id} - remove a product
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<()>>> {
    let old = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;

    let deleted = product::delete(state.pool(), id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Product {id} not found")));
    }

    audit_log!(
        state,
        AuditAction::ProductDeleted,
        "products",
        id,
        current,
        Some(create_snapshot(&old, "products")),
        None,
    );
    Ok(ok_with_message((), format!("Product '{}' deleted", old.name)))
}

/// PUT /api/products/{id}/availability - toggle menu availability
pub async fn set_availability(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<AvailabilityUpdate>,
) -> AppResult<Json<AppResponse<Product>>> {
    let old = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;

    let changes = ProductUpdate {
        is_available: Some(payload.is_available),
        ..ProductUpdate::default()
    };
    let updated = product::update(state.pool(), id, &changes).await?;

    audit_log!(
        state,
        AuditAction::ProductAvailabilityChanged,
        "products",
        id,
        current,
        Some(create_snapshot(&old, "products")),
        Some(create_diff(&old, &updated, "products")),
    );
    Ok(ok(updated))
}

/// POST /api/products/{id}/stock - manual stock adjustment
///
/// Body carries a signed delta and a mandatory reason; the repository
/// writes the matching ADJUSTMENT movement in the same transaction.
pub async fn adjust_stock(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<StockAdjust>,
) -> AppResult<Json<AppResponse<Product>>> {
    validate_required_text(&payload.reason, "reason", MAX_NOTE_LEN)?;

    let old = product::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;

    let updated = inventory::adjust_stock(state.pool(), id, &payload, Some(current.id)).await?;

    audit_log!(
        state,
        AuditAction::StockAdjusted,
        "products",
        id,
        current,
        Some(create_snapshot(&old, "products")),
        Some(serde_json::json!({
            "delta": payload.delta,
            "reason": payload.reason,
            "stock_before": old.stock,
            "stock_after": updated.stock,
        })),
    );
    Ok(ok(updated))
}
