//! Authentication handlers

use std::time::Duration;

use axum::{Extension, Json, extract::State};
use shared::models::{LoginRequest, LoginResponse, UserResponse};

use crate::audit::AuditAction;
use crate::audit_log;
use crate::auth::{CurrentUser, verify_password};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// Fixed processing floor for login attempts.
///
/// Every failure path takes at least this long, so response timing does
/// not reveal whether the username exists.
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// POST /api/auth/login - authenticate and issue a JWT
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AppResponse<LoginResponse>>> {
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let Some(user) = user::find_by_username(state.pool(), &payload.username).await? else {
        security_log!(WARN, "login_failed", username = payload.username.clone());
        audit_log!(
            state,
            AuditAction::LoginFailed,
            "users",
            payload.username,
            None,
            Some(serde_json::json!({ "reason": "unknown_username" })),
        );
        return Err(AppError::invalid_credentials());
    };

    if !user.is_active {
        security_log!(
            WARN,
            "login_inactive_account",
            user_id = user.id,
            username = user.username.clone()
        );
        audit_log!(
            state,
            AuditAction::LoginFailed,
            "users",
            user.id,
            None,
            Some(serde_json::json!({
                "reason": "inactive_account",
                "username": user.username,
            })),
        );
        return Err(AppError::invalid_credentials());
    }

    if !verify_password(&payload.password, &user.password_hash) {
        security_log!(
            WARN,
            "login_wrong_password",
            user_id = user.id,
            username = user.username.clone()
        );
        audit_log!(
            state,
            AuditAction::LoginFailed,
            "users",
            user.id,
            None,
            Some(serde_json::json!({
                "reason": "wrong_password",
                "username": user.username,
            })),
        );
        return Err(AppError::invalid_credentials());
    }

    let token = state
        .jwt_service()
        .generate_token(user.id, &user.username, user.role.as_str())
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    user::record_login(state.pool(), user.id).await?;

    audit_log!(state, AuditAction::LoginSuccess, "users", user.id, user, None, None);

    let expires_in = state.jwt_service().config.expiration_minutes * 60;
    Ok(ok(LoginResponse {
        token,
        expires_in,
        user: UserResponse::from(user),
    }))
}

/// GET /api/auth/me - profile of the authenticated user
pub async fn me(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<AppResponse<UserResponse>>> {
    let user = user::find_by_id(state.pool(), current.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", current.id)))?;
    Ok(ok(UserResponse::from(user)))
}
