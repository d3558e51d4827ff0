//! Table (mesa) handlers
//!
//! Status transitions that belong to the order lifecycle (OCCUPIED on
//! order creation, AVAILABLE on close) happen inside the order
//! repository transactions; the manual status route is for the floor
//! staff cases like maintenance.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{
    Mesa, MesaAssignMesero, MesaCreate, MesaStatusUpdate, MesaUpdate, MesaWithMesero,
};

use crate::audit::AuditAction;
use crate::audit::diff::{create_diff, create_snapshot};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::mesa;
use crate::utils::validation::{MAX_NAME_LEN, validate_optional_text};
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

/// GET /api/mesas - all tables with assigned waiter names
pub async fn list(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<MesaWithMesero>>>> {
    let mesas = mesa::find_all(state.pool()).await?;
    Ok(ok(mesas))
}

/// GET /api/mesas/{id} - single table
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<Mesa>>> {
    let found = mesa::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Mesa {id} not found")))?;
    Ok(ok(found))
}

/// POST /api/mesas - create a table
pub async fn create(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<MesaCreate>,
) -> AppResult<Json<AppResponse<Mesa>>> {
    validate_optional_text(&payload.location, "location", MAX_NAME_LEN)?;

    let created = mesa::create(state.pool(), &payload).await?;

    audit_log!(
        state,
        AuditAction::MesaCreated,
        "mesas",
        created.id,
        current,
        None,
        Some(create_snapshot(&created, "mesas")),
    );
    Ok(ok(created))
}

/// PUT /api/mesas/{id} - update number, capacity or location
pub async fn update(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<MesaUpdate>,
) -> AppResult<Json<AppResponse<Mesa>>> {
    validate_optional_text(&payload.location, "location", MAX_NAME_LEN)?;

    let old = mesa::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Mesa {id} not found")))?;

    let updated = mesa::update(state.pool(), id, &payload).await?;

    audit_log!(
        state,
        AuditAction::MesaUpdated,
        "mesas",
        id,
        current,
        Some(create_snapshot(&old, "mesas")),
        Some(create_diff(&old, &updated, "mesas")),
    );
    Ok(ok(updated))
}

/// DELETE /api/mesas/{id} - remove a table
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<()>>> {
    let old = mesa::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Mesa {id} not found")))?;

    let deleted = mesa::delete(state.pool(), id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Mesa {id} not found")));
    }

    audit_log!(
        state,
        AuditAction::MesaDeleted,
        "mesas",
        id,
        current,
        Some(create_snapshot(&old, "mesas")),
        None,
    );
    Ok(ok_with_message((), format!("Mesa {} deleted", old.number)))
}

/// PUT /api/mesas/{id}/status - manual status change
pub async fn set_status(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<MesaStatusUpdate>,
) -> AppResult<Json<AppResponse<Mesa>>> {
    let old = mesa::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Mesa {id} not found")))?;

    let updated = mesa::set_status(state.pool(), id, payload.status).await?;

    audit_log!(
        state,
        AuditAction::MesaStatusChanged,
        "mesas",
        id,
        current,
        Some(create_snapshot(&old, "mesas")),
        Some(create_diff(&old, &updated, "mesas")),
    );
    Ok(ok(updated))
}

/// PUT /api/mesas/{id}/mesero - assign or clear the waiter
pub async fn assign_mesero(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<MesaAssignMesero>,
) -> AppResult<Json<AppResponse<Mesa>>> {
    let old = mesa::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Mesa {id} not found")))?;

    let updated = mesa::assign_mesero(state.pool(), id, payload.mesero_id).await?;

    audit_log!(
        state,
        AuditAction::MeseroAssigned,
        "mesas",
        id,
        current,
        Some(create_snapshot(&old, "mesas")),
        Some(create_diff(&old, &updated, "mesas")),
    );
    Ok(ok(updated))
}
