//! SOS-related DTOs for create, accept, status update, and query
//! operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{GeoPoint, SosId, SosRequest, SosStatus, SosType};

/// Location payload: plain coordinate pair in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct LocationDto {
    /// Longitude in degrees, -180 to 180.
    pub longitude: f64,
    /// Latitude in degrees, -90 to 90.
    pub latitude: f64,
}

/// Request body for `POST /sos`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSosRequest {
    /// Emergency category. Unrecognized values map to `other`.
    #[serde(default)]
    pub sos_type: SosType,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Incident location.
    pub location: LocationDto,
}

/// Request body for `PATCH /sos/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status name. Only `Resolved` and `Cancelled` are
    /// reachable through this endpoint.
    pub status: String,
}

/// Query parameters for `GET /sos/nearby`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct NearbyQuery {
    /// Search center latitude in degrees.
    pub latitude: f64,
    /// Search center longitude in degrees.
    pub longitude: f64,
    /// Search radius in meters. Defaults to 10 km.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    /// Maximum number of results (capped at 50).
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_max_distance() -> f64 {
    10_000.0
}

/// Full SOS record view returned by every SOS endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SosDto {
    /// Record identifier.
    pub id: SosId,
    /// Identity id of the requester.
    pub requester_id: String,
    /// Display name of the requester.
    pub requester_name: String,
    /// Emergency category.
    pub sos_type: SosType,
    /// Free-text description.
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: SosStatus,
    /// Incident location.
    pub location: LocationDto,
    /// Assigned volunteer id, once accepted.
    pub volunteer_id: Option<String>,
    /// Assigned volunteer display name, once accepted.
    pub volunteer_name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Acceptance timestamp.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Cancellation timestamp.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<SosRequest> for SosDto {
    fn from(r: SosRequest) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            requester_name: r.requester_name,
            sos_type: r.sos_type,
            description: r.description,
            status: r.status,
            location: LocationDto {
                longitude: r.location.longitude,
                latitude: r.location.latitude,
            },
            volunteer_id: r.volunteer_id,
            volunteer_name: r.volunteer_name,
            created_at: r.created_at,
            updated_at: r.updated_at,
            accepted_at: r.accepted_at,
            resolved_at: r.resolved_at,
            cancelled_at: r.cancelled_at,
        }
    }
}

/// One nearby result with its computed distance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NearbySosDto {
    /// The pending record.
    #[serde(flatten)]
    pub sos: SosDto,
    /// Great-circle distance from the query point, in meters.
    pub distance_m: f64,
}

/// List response for `GET /sos/nearby` and `GET /sos/my`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SosListResponse<T> {
    /// Result rows.
    pub data: Vec<T>,
    /// Number of rows returned.
    pub count: usize,
}

impl NearbyQuery {
    /// Validates the query point and normalizes the radius.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GatewayError::Validation`] for
    /// out-of-range coordinates.
    pub fn center(&self) -> Result<GeoPoint, crate::error::GatewayError> {
        GeoPoint::new(self.longitude, self.latitude)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults_type_and_description() {
        let raw = r#"{"location":{"longitude":77.21,"latitude":28.61}}"#;
        let Ok(req) = serde_json::from_str::<CreateSosRequest>(raw) else {
            panic!("request did not parse");
        };
        assert_eq!(req.sos_type, SosType::Other);
        assert!(req.description.is_none());
    }

    #[test]
    fn unknown_sos_type_maps_to_other() {
        let raw = r#"{"sos_type":"alien","location":{"longitude":0.0,"latitude":0.0}}"#;
        let Ok(req) = serde_json::from_str::<CreateSosRequest>(raw) else {
            panic!("request did not parse");
        };
        assert_eq!(req.sos_type, SosType::Other);
    }

    #[test]
    fn nearby_query_defaults_radius() {
        let Ok(query) =
            serde_json::from_str::<NearbyQuery>(r#"{"latitude":28.61,"longitude":77.21}"#)
        else {
            panic!("query did not parse");
        };
        assert!((query.max_distance - 10_000.0).abs() < f64::EPSILON);
        assert!(query.limit.is_none());
        assert!(query.center().is_ok());
    }

    #[test]
    fn nearby_query_rejects_bad_center() {
        let Ok(query) =
            serde_json::from_str::<NearbyQuery>(r#"{"latitude":95.0,"longitude":77.21}"#)
        else {
            panic!("query did not parse");
        };
        assert!(query.center().is_err());
    }

    #[test]
    fn dto_mirrors_record() {
        let Ok(location) = GeoPoint::new(77.21, 28.61) else {
            panic!("valid point");
        };
        let record = SosRequest::new(
            "u-1".to_string(),
            "Asha".to_string(),
            SosType::Fire,
            None,
            location,
        );
        let id = record.id;
        let dto = SosDto::from(record);
        assert_eq!(dto.id, id);
        assert_eq!(dto.status, SosStatus::Pending);
        assert!((dto.location.longitude - 77.21).abs() < f64::EPSILON);
    }
}
