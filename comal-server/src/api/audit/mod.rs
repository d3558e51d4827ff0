//! Audit trail API
//!
//! Admin only. Entries are append-only; this surface reads and
//! verifies, it never writes.

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/audit", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::query))
        .route("/verify", get(handler::verify))
        .layer(middleware::from_fn(require_admin))
}
