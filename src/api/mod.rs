//! REST API layer: route handlers, DTOs, and router composition.
//!
//! SOS and admin endpoints are mounted under `/api/v1`; health and the
//! type catalog live at the root. The WebSocket upgrade endpoint is
//! added at `/ws` alongside this router.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::ws;

/// Builds the complete router with all REST and WebSocket endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .route("/ws", get(ws::ws_handler))
}
