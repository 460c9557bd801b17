//! Admin handlers: live connection listing.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::auth::{Identity, Role};
use crate::error::{ErrorResponse, GatewayError};
use crate::presence::PresenceSnapshot;

/// Response body for `GET /admin/connections`.
#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    /// Connected identities.
    pub data: Vec<PresenceSnapshot>,
    /// Number of open channels.
    pub count: usize,
}

/// `GET /admin/connections` — Who is connected right now.
///
/// # Errors
///
/// Returns [`GatewayError::Forbidden`] for non-admin callers.
#[utoipa::path(
    get,
    path = "/api/v1/admin/connections",
    tag = "Admin",
    summary = "List open real-time channels",
    description = "Returns every connected identity with role, last known location, and connection timestamps. Presence is ephemeral and resets on restart.",
    responses(
        (status = 200, description = "Connected identities", body = serde_json::Value),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, GatewayError> {
    identity.require_role(Role::Admin)?;

    let data = state.presence.snapshot().await;
    let count = data.len();
    Ok(Json(ConnectionsResponse { data, count }))
}

/// Admin routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/connections", get(list_connections))
}
