//! Domain events reflecting SOS lifecycle mutations.
//!
//! Every successful lifecycle operation emits a [`SosEvent`] through
//! the [`super::EventBus`]. The fan-out router matches exhaustively on
//! the event kind to decide recipient groups; persistence optionally
//! appends each event to the Postgres log. The closed variant set
//! replaces the per-emit-site ad hoc payloads of loosely typed stacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sos_id::SosId;
use super::sos_request::{SosRequest, SosStatus};
use crate::auth::Role;

/// The actor that triggered a status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRef {
    /// Identity id of the actor.
    pub id: String,
    /// Display name of the actor.
    pub name: String,
    /// Role of the actor at the time of the change.
    pub role: Role,
}

/// Domain event emitted after every successful lifecycle mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SosEvent {
    /// A new SOS request entered the system in `Pending`.
    SosCreated {
        /// Full record snapshot at creation time.
        sos: SosRequest,
    },

    /// A volunteer claimed a Pending request.
    SosAccepted {
        /// Request identifier.
        sos_id: SosId,
        /// Identity id of the accepting volunteer.
        volunteer_id: String,
        /// Display name of the accepting volunteer.
        volunteer_name: String,
        /// Identity id of the original requester.
        requester_id: String,
        /// Acceptance timestamp.
        accepted_at: DateTime<Utc>,
    },

    /// A request moved to a new status.
    SosStatusChanged {
        /// Request identifier.
        sos_id: SosId,
        /// Status before the change.
        old_status: SosStatus,
        /// Status after the change.
        new_status: SosStatus,
        /// Identity id of the original requester.
        requester_id: String,
        /// Identity id of the assigned volunteer, if any.
        volunteer_id: Option<String>,
        /// Who performed the change.
        actor: ActorRef,
        /// Change timestamp.
        updated_at: DateTime<Utc>,
    },
}

impl SosEvent {
    /// Returns the SOS request ID associated with this event.
    #[must_use]
    pub fn sos_id(&self) -> SosId {
        match self {
            Self::SosCreated { sos } => sos.id,
            Self::SosAccepted { sos_id, .. } | Self::SosStatusChanged { sos_id, .. } => *sos_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::SosCreated { .. } => "sos_created",
            Self::SosAccepted { .. } => "sos_accepted",
            Self::SosStatusChanged { .. } => "sos_status_changed",
        }
    }
}
