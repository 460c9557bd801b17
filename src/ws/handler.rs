//! WebSocket upgrade endpoint.
//!
//! Browsers cannot set headers on the upgrade request, so the bearer
//! token rides in the `token` query parameter. Verification happens
//! before the upgrade completes; a bad token is a plain 401 and no
//! socket is opened.

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;

use super::connection;
use crate::app_state::AppState;
use crate::error::GatewayError;

/// Query parameters accepted by the upgrade endpoint.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    /// Bearer token for the connecting identity.
    pub token: Option<String>,
}

/// `GET /ws?token=...` - authenticate, then upgrade.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] when the token is missing or
/// fails verification.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> Result<Response, GatewayError> {
    let token = query
        .token
        .ok_or_else(|| GatewayError::Unauthorized("no token provided".to_string()))?;
    let identity = state.auth.verify(&token)?;

    tracing::debug!(identity_id = %identity.id, role = %identity.role, "websocket upgrade");
    Ok(ws.on_upgrade(move |socket| connection::handle_socket(socket, state, identity)))
}
