//! Order lifecycle API

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/pay", post(handler::pay))
        .route("/{id}/cancel", post(handler::cancel))
        .route(
            "/{id}/items/{item_id}/status",
            put(handler::update_item_status),
        )
        .route(
            "/{id}/items/{item_id}",
            axum::routing::delete(handler::cancel_item),
        )
}
