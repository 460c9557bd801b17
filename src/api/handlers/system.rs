//! System endpoints: health check and SOS type catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Supported SOS type info.
#[derive(Debug, Serialize, ToSchema)]
struct SosTypeInfo {
    sos_type: &'static str,
    description: &'static str,
}

/// `GET /config/sos-types` — List recognized SOS categories.
#[utoipa::path(
    get,
    path = "/config/sos-types",
    tag = "System",
    summary = "List recognized SOS categories",
    description = "Returns the emergency categories a request may carry. Unrecognized values submitted by clients fold into `other`.",
    responses(
        (status = 200, description = "SOS category catalog", body = Vec<SosTypeInfo>),
    )
)]
pub async fn sos_types_handler() -> impl IntoResponse {
    let types = vec![
        SosTypeInfo {
            sos_type: "medical",
            description: "Medical emergency requiring immediate assistance",
        },
        SosTypeInfo {
            sos_type: "accident",
            description: "Road or workplace accident",
        },
        SosTypeInfo {
            sos_type: "fire",
            description: "Fire or explosion hazard",
        },
        SosTypeInfo {
            sos_type: "harassment",
            description: "Harassment or personal safety threat",
        },
        SosTypeInfo {
            sos_type: "emergency",
            description: "General urgent situation",
        },
        SosTypeInfo {
            sos_type: "other",
            description: "Anything not covered by the categories above",
        },
    ];
    (StatusCode::OK, Json(types))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/sos-types", get(sos_types_handler))
}
