//! Audit trail handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::audit::{AuditChainVerification, AuditListResponse, AuditQuery};
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    /// Window start (epoch millis, inclusive)
    pub from: Option<i64>,
    /// Window end (epoch millis, inclusive)
    pub to: Option<i64>,
}

/// GET /api/audit - filtered, paginated audit entries
pub async fn query(
    State(state): State<ServerState>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<AppResponse<AuditListResponse>>> {
    let (items, total) = state.audit().query(&query).await?;
    Ok(ok(AuditListResponse { items, total }))
}

/// GET /api/audit/verify - recompute the hash chain over a window
pub async fn verify(
    State(state): State<ServerState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<AppResponse<AuditChainVerification>>> {
    let verification = state.audit().verify_chain(query.from, query.to).await?;
    Ok(ok(verification))
}
