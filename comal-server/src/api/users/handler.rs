//! Staff account handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{UserCreate, UserResponse, UserUpdate};

use crate::audit::AuditAction;
use crate::audit::diff::{create_diff, create_snapshot};
use crate::audit_log;
use crate::auth::{CurrentUser, hash_password};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_PASSWORD_LEN, MAX_SHORT_TEXT_LEN, validate_required_text,
};
use crate::utils::{AppError, AppResponse, AppResult, ok};

const MIN_PASSWORD_LEN: usize = 8;

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password is too long (max {MAX_PASSWORD_LEN} characters)"
        )));
    }
    Ok(())
}

/// GET /api/users - list all staff accounts
pub async fn list(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<UserResponse>>>> {
    let users = user::find_all(state.pool()).await?;
    Ok(ok(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/users/{id} - single account
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<UserResponse>>> {
    let found = user::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
    Ok(ok(UserResponse::from(found)))
}

/// POST /api/users - create a staff account
pub async fn create(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<AppResponse<UserResponse>>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&payload.username, "username", MAX_SHORT_TEXT_LEN)?;
    validate_password(&payload.password)?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
    let created = user::create(state.pool(), &payload, &password_hash).await?;

    audit_log!(
        state,
        AuditAction::UserCreated,
        "users",
        created.id,
        current,
        None,
        Some(create_snapshot(&created, "users")),
    );
    Ok(ok(UserResponse::from(created)))
}

/// PUT /api/users/{id} - update name, role, password or active flag
pub async fn update(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<AppResponse<UserResponse>>> {
    let old = user::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;

    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    let password_hash = match &payload.password {
        Some(p) => {
            validate_password(p)?;
            Some(
                hash_password(p)
                    .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?,
            )
        }
        None => None,
    };

    let updated = user::update(state.pool(), id, &payload, password_hash.as_deref()).await?;

    audit_log!(
        state,
        AuditAction::UserUpdated,
        "users",
        id,
        current,
        Some(create_snapshot(&old, "users")),
        Some(create_diff(&old, &updated, "users")),
    );
    Ok(ok(UserResponse::from(updated)))
}
