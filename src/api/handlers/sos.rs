//! SOS lifecycle handlers: create, nearby, my, accept, status, get.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateSosRequest, NearbyQuery, NearbySosDto, SosDto, SosListResponse, UpdateStatusRequest,
};
use crate::app_state::AppState;
use crate::auth::{Identity, Role};
use crate::domain::{SosId, SosStatus};
use crate::error::{ErrorResponse, GatewayError};
use crate::service::CreateSosInput;

/// `POST /sos` — Raise a new SOS request.
///
/// # Errors
///
/// Returns [`GatewayError`] on bad coordinates or a non-user role.
#[utoipa::path(
    post,
    path = "/api/v1/sos",
    tag = "Sos",
    summary = "Raise an SOS request",
    description = "Creates a Pending SOS request at the given location on behalf of the authenticated user. Volunteers are notified in real time.",
    request_body = CreateSosRequest,
    responses(
        (status = 201, description = "SOS created", body = SosDto),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not a user", body = ErrorResponse),
    )
)]
pub async fn create_sos(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateSosRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    identity.require_role(Role::User)?;

    let sos = state
        .sos_service
        .create(
            &identity,
            CreateSosInput {
                sos_type: req.sos_type,
                description: req.description,
                longitude: req.location.longitude,
                latitude: req.location.latitude,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SosDto::from(sos))))
}

/// `GET /sos/nearby` — Pending requests around a point.
///
/// # Errors
///
/// Returns [`GatewayError`] on bad coordinates or a non-volunteer role.
#[utoipa::path(
    get,
    path = "/api/v1/sos/nearby",
    tag = "Sos",
    summary = "Find nearby pending requests",
    description = "Returns Pending SOS requests within the given radius, nearest first, each with its computed distance in meters. Volunteer pull path alongside the real-time push.",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Nearby pending requests", body = SosListResponse<NearbySosDto>),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 403, description = "Caller is not a volunteer", body = ErrorResponse),
    )
)]
pub async fn nearby_sos(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    identity.require_role(Role::Volunteer)?;

    let center = query.center()?;
    let results = state
        .sos_service
        .find_nearby_pending(center, query.max_distance, query.limit)
        .await;

    let data: Vec<NearbySosDto> = results
        .into_iter()
        .map(|(sos, distance_m)| NearbySosDto {
            sos: SosDto::from(sos),
            distance_m,
        })
        .collect();
    let count = data.len();
    Ok(Json(SosListResponse { data, count }))
}

/// `GET /sos/my` — The caller's own requests, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/sos/my",
    tag = "Sos",
    summary = "List own requests",
    description = "Returns every SOS request created by the authenticated identity, newest first.",
    responses(
        (status = 200, description = "Own requests", body = SosListResponse<SosDto>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn my_sos(State(state): State<AppState>, identity: Identity) -> impl IntoResponse {
    let data: Vec<SosDto> = state
        .sos_service
        .list_for_requester(&identity.id)
        .await
        .into_iter()
        .map(SosDto::from)
        .collect();
    let count = data.len();
    Json(SosListResponse { data, count })
}

/// `POST /sos/{id}/accept` — Claim a pending request.
///
/// # Errors
///
/// Returns [`GatewayError`] when the request is gone, already claimed,
/// or the caller is not a volunteer.
#[utoipa::path(
    post,
    path = "/api/v1/sos/{id}/accept",
    tag = "Sos",
    summary = "Accept a pending request",
    description = "Atomically claims a Pending request for the calling volunteer. At most one acceptance can ever succeed per request.",
    params(("id" = uuid::Uuid, Path, description = "SOS request id")),
    responses(
        (status = 200, description = "Request accepted", body = SosDto),
        (status = 403, description = "Caller is not a volunteer", body = ErrorResponse),
        (status = 404, description = "Unknown request id", body = ErrorResponse),
        (status = 409, description = "Already accepted or no longer pending", body = ErrorResponse),
    )
)]
pub async fn accept_sos(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    identity.require_role(Role::Volunteer)?;
    let sos = state
        .sos_service
        .accept(SosId::from_uuid(id), &identity)
        .await?;
    Ok(Json(SosDto::from(sos)))
}

/// `PATCH /sos/{id}/status` — Resolve or cancel a request.
///
/// # Errors
///
/// Returns [`GatewayError`] for unknown status names, invalid
/// transitions, or unauthorized actors.
#[utoipa::path(
    patch,
    path = "/api/v1/sos/{id}/status",
    tag = "Sos",
    summary = "Update request status",
    description = "Moves a request to Resolved or Cancelled. Permitted for admins, the assigned volunteer, and the original requester. Transition validity is checked before authorization.",
    params(("id" = uuid::Uuid, Path, description = "SOS request id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = SosDto),
        (status = 400, description = "Unrecognized status value", body = ErrorResponse),
        (status = 403, description = "Actor not permitted", body = ErrorResponse),
        (status = 404, description = "Unknown request id", body = ErrorResponse),
        (status = 409, description = "Invalid transition", body = ErrorResponse),
    )
)]
pub async fn update_sos_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let new_status = SosStatus::from_str(&req.status)?;
    let sos = state
        .sos_service
        .update_status(SosId::from_uuid(id), new_status, &identity)
        .await?;
    Ok(Json(SosDto::from(sos)))
}

/// `GET /sos/{id}` — Fetch one request.
///
/// # Errors
///
/// Returns [`GatewayError`] when the record is missing or the caller
/// is neither the requester, the assigned volunteer, nor an admin.
#[utoipa::path(
    get,
    path = "/api/v1/sos/{id}",
    tag = "Sos",
    summary = "Get a request",
    description = "Returns one SOS record. Visible to the requester, the assigned volunteer, and admins.",
    params(("id" = uuid::Uuid, Path, description = "SOS request id")),
    responses(
        (status = 200, description = "The record", body = SosDto),
        (status = 403, description = "Not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Unknown request id", body = ErrorResponse),
    )
)]
pub async fn get_sos(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let sos = state.sos_service.get(SosId::from_uuid(id), &identity).await?;
    Ok(Json(SosDto::from(sos)))
}

/// SOS routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sos", post(create_sos))
        .route("/sos/nearby", get(nearby_sos))
        .route("/sos/my", get(my_sos))
        .route("/sos/{id}/accept", post(accept_sos))
        .route("/sos/{id}/status", patch(update_sos_status))
        .route("/sos/{id}", get(get_sos))
}
