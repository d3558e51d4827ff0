//! Inventory movement API
//!
//! Read-only: movements are written by the order and product
//! repositories, never directly through this surface.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/inventory", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/movements", get(handler::movements))
        .route("/low-stock", get(handler::low_stock))
}
