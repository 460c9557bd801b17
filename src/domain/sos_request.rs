//! The SOS request record and its status machine.
//!
//! A record is created in `Pending`, may be claimed into `InProgress`
//! by exactly one volunteer, and ends in `Resolved` or `Cancelled`.
//! Terminal states admit no further transitions. The location is set
//! once at creation and never mutated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::geo::GeoPoint;
use super::sos_id::SosId;
use crate::error::GatewayError;

/// Category of emergency. Open enumeration: unknown values
/// deserialize to [`SosType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SosType {
    /// Medical emergency.
    Medical,
    /// Traffic or other accident.
    Accident,
    /// Fire.
    Fire,
    /// Harassment or assault.
    Harassment,
    /// Generic urgent emergency.
    Emergency,
    /// Anything else (default).
    #[serde(other)]
    Other,
}

impl Default for SosType {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for SosType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Medical => "medical",
            Self::Accident => "accident",
            Self::Fire => "fire",
            Self::Harassment => "harassment",
            Self::Emergency => "emergency",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle status of an SOS request.
///
/// Partial order: `Pending < InProgress < {Resolved, Cancelled}`.
/// A record never returns to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SosStatus {
    /// Created, awaiting a volunteer.
    Pending,
    /// Claimed by exactly one volunteer.
    InProgress,
    /// Help delivered; terminal.
    Resolved,
    /// Withdrawn or aborted; terminal.
    Cancelled,
}

impl SosStatus {
    /// Returns `true` for the terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }

    /// Returns `true` if the status machine permits `self -> next`.
    ///
    /// `Pending -> InProgress` is reserved for acceptance;
    /// `Pending -> Cancelled` supports requester withdrawal before any
    /// volunteer claims the request.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Cancelled)
                | (Self::InProgress, Self::Resolved)
                | (Self::InProgress, Self::Cancelled)
        )
    }
}

impl fmt::Display for SosStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Resolved => "Resolved",
            Self::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SosStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "InProgress" | "In Progress" => Ok(Self::InProgress),
            "Resolved" => Ok(Self::Resolved),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(GatewayError::InvalidStatus(other.to_string())),
        }
    }
}

/// A single SOS request record.
///
/// Owned by [`super::SosStore`]; every mutation happens under the
/// record's write lock so the `Pending -> InProgress` claim is atomic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SosRequest {
    /// Unique identifier, generated at creation.
    pub id: SosId,
    /// Identity id of the requester; immutable.
    pub requester_id: String,
    /// Display name of the requester, captured from the identity
    /// assertion at creation (contact field for the volunteer payload).
    pub requester_name: String,
    /// Emergency category.
    pub sos_type: SosType,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Geographic point, set once at creation.
    pub location: GeoPoint,
    /// Current lifecycle status.
    pub status: SosStatus,
    /// Assigned volunteer identity id; set exactly once per
    /// successful acceptance.
    pub volunteer_id: Option<String>,
    /// Display name of the assigned volunteer.
    pub volunteer_name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set when the request was accepted.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Set when the request was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set when the request was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl SosRequest {
    /// Creates a new Pending record with no assigned volunteer.
    #[must_use]
    pub fn new(
        requester_id: String,
        requester_name: String,
        sos_type: SosType,
        description: Option<String>,
        location: GeoPoint,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SosId::new(),
            requester_id,
            requester_name,
            sos_type,
            description,
            location,
            status: SosStatus::Pending,
            volunteer_id: None,
            volunteer_name: None,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            resolved_at: None,
            cancelled_at: None,
        }
    }

    /// Returns `true` if `identity_id` is the requester.
    #[must_use]
    pub fn is_requester(&self, identity_id: &str) -> bool {
        self.requester_id == identity_id
    }

    /// Returns `true` if `identity_id` is the currently assigned volunteer.
    #[must_use]
    pub fn is_assigned_volunteer(&self, identity_id: &str) -> bool {
        self.volunteer_id.as_deref() == Some(identity_id)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_request() -> SosRequest {
        let Ok(location) = GeoPoint::new(77.21, 28.61) else {
            panic!("valid point");
        };
        SosRequest::new(
            "user-1".to_string(),
            "Asha".to_string(),
            SosType::Medical,
            Some("chest pain".to_string()),
            location,
        )
    }

    #[test]
    fn new_record_is_pending_and_unassigned() {
        let sos = make_request();
        assert_eq!(sos.status, SosStatus::Pending);
        assert!(sos.volunteer_id.is_none());
        assert!(sos.accepted_at.is_none());
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use SosStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Resolved));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(!Resolved.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(!SosStatus::Pending.is_terminal());
        assert!(!SosStatus::InProgress.is_terminal());
        assert!(SosStatus::Resolved.is_terminal());
        assert!(SosStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_parses_recognized_values_only() {
        assert_eq!("Resolved".parse::<SosStatus>().ok(), Some(SosStatus::Resolved));
        assert_eq!(
            "In Progress".parse::<SosStatus>().ok(),
            Some(SosStatus::InProgress)
        );
        assert!("Escalated".parse::<SosStatus>().is_err());
    }

    #[test]
    fn unknown_type_deserializes_to_other() {
        let parsed: Result<SosType, _> = serde_json::from_str("\"Flood\"");
        assert_eq!(parsed.ok(), Some(SosType::Other));
    }

    #[test]
    fn actor_checks() {
        let mut sos = make_request();
        assert!(sos.is_requester("user-1"));
        assert!(!sos.is_requester("user-2"));
        assert!(!sos.is_assigned_volunteer("vol-1"));
        sos.volunteer_id = Some("vol-1".to_string());
        assert!(sos.is_assigned_volunteer("vol-1"));
    }
}
