//! Staff account API
//!
//! Every route requires the admin role. Accounts are never hard
//! deleted, deactivation keeps historical orders attributable.

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/users", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
        .layer(middleware::from_fn(require_admin))
}
