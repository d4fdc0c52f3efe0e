//! Order API Module
//!
//! Customer-facing order routes. Every route requires a bearer token; the
//! order core decides what the caller may see or change.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/mine", get(handler::list_mine))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
}
