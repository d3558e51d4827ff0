//! Dashboard statistics handlers

use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::db::repository::statistics::{self, DashboardStats};
use crate::utils::{AppResponse, AppResult, ok};

/// GET /api/statistics/dashboard - today's numbers for the front desk
pub async fn dashboard(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<DashboardStats>>> {
    let stats = statistics::dashboard(state.pool()).await?;
    Ok(ok(stats))
}
