//! SOS lifecycle engine: the single source of truth for every status
//! transition.
//!
//! Every mutation follows the pattern: acquire the record's write lock,
//! check the transition guard, apply the change, release the lock, then
//! emit events and persist best-effort. Event delivery and persistence
//! failures never roll back or fail the triggering operation.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{Identity, Role};
use crate::domain::{
    ActorRef, DEFAULT_NEARBY_LIMIT, EventBus, GeoPoint, SosEvent, SosId, SosRequest, SosStatus,
    SosStore, SosType,
};
use crate::error::GatewayError;
use crate::persistence::PostgresPersistence;

/// Input for creating a new SOS request.
#[derive(Debug, Clone)]
pub struct CreateSosInput {
    /// Emergency category (defaults to [`SosType::Other`]).
    pub sos_type: SosType,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

/// Orchestration layer for all SOS lifecycle operations.
///
/// Stateless coordinator: owns references to [`SosStore`] for state and
/// [`EventBus`] for event emission, plus an optional persistence layer
/// mirroring mutations into Postgres.
#[derive(Debug, Clone)]
pub struct SosService {
    store: Arc<SosStore>,
    event_bus: EventBus,
    persistence: Option<Arc<PostgresPersistence>>,
}

impl SosService {
    /// Creates a new `SosService` without persistence.
    #[must_use]
    pub fn new(store: Arc<SosStore>, event_bus: EventBus) -> Self {
        Self {
            store,
            event_bus,
            persistence: None,
        }
    }

    /// Attaches the optional Postgres mirror.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<PostgresPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Creates a new Pending request for `requester`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for malformed coordinates.
    pub async fn create(
        &self,
        requester: &Identity,
        input: CreateSosInput,
    ) -> Result<SosRequest, GatewayError> {
        let location = GeoPoint::new(input.longitude, input.latitude)?;
        let request = SosRequest::new(
            requester.id.clone(),
            requester.name.clone(),
            input.sos_type,
            input.description,
            location,
        );
        let snapshot = request.clone();
        let sos_id = self.store.insert(request).await?;

        let event = SosEvent::SosCreated {
            sos: snapshot.clone(),
        };
        self.persist(&event, Some(&snapshot));
        let _ = self.event_bus.publish(event);

        tracing::info!(%sos_id, requester_id = %requester.id, sos_type = %snapshot.sos_type, "sos created");
        Ok(snapshot)
    }

    /// Claims a Pending request for `volunteer`.
    ///
    /// The `Pending -> InProgress` transition and the assignment are
    /// applied together under the record's write lock, so at most one
    /// caller succeeds even under concurrent attempts on the same id.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotFound`] if the id does not exist.
    /// - [`GatewayError::AlreadyAssigned`] if another volunteer holds
    ///   the assignment.
    /// - [`GatewayError::AlreadyHandled`] if the request left `Pending`
    ///   for any other reason.
    pub async fn accept(
        &self,
        sos_id: SosId,
        volunteer: &Identity,
    ) -> Result<SosRequest, GatewayError> {
        let entry_lock = self.store.get(sos_id).await?;
        let snapshot = {
            let mut record = entry_lock.write().await;
            if record.status != SosStatus::Pending {
                return Err(match &record.volunteer_id {
                    Some(other) if other != &volunteer.id => GatewayError::AlreadyAssigned(sos_id),
                    _ => GatewayError::AlreadyHandled(sos_id),
                });
            }
            let now = Utc::now();
            record.status = SosStatus::InProgress;
            record.volunteer_id = Some(volunteer.id.clone());
            record.volunteer_name = Some(volunteer.name.clone());
            record.accepted_at = Some(now);
            record.updated_at = now;
            record.clone()
        };

        self.store
            .remove_from_pending_index(sos_id, &snapshot.location)
            .await;

        let event = SosEvent::SosAccepted {
            sos_id,
            volunteer_id: volunteer.id.clone(),
            volunteer_name: volunteer.name.clone(),
            requester_id: snapshot.requester_id.clone(),
            accepted_at: snapshot.accepted_at.unwrap_or(snapshot.updated_at),
        };
        self.persist(&event, Some(&snapshot));
        let _ = self.event_bus.publish(event);

        tracing::info!(%sos_id, volunteer_id = %volunteer.id, "sos accepted");
        Ok(snapshot)
    }

    /// Moves a request to `new_status` on behalf of `actor`.
    ///
    /// Permitted targets are `Resolved` and `Cancelled`; acceptance is
    /// the only way into `InProgress`. Transition validity is checked
    /// before authorization, so a terminal record answers
    /// `InvalidTransition` regardless of who asks.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotFound`] if the id does not exist.
    /// - [`GatewayError::InvalidTransition`] for terminal or otherwise
    ///   incompatible current states.
    /// - [`GatewayError::Forbidden`] unless the actor is an admin, the
    ///   assigned volunteer, or the original requester.
    pub async fn update_status(
        &self,
        sos_id: SosId,
        new_status: SosStatus,
        actor: &Identity,
    ) -> Result<SosRequest, GatewayError> {
        let entry_lock = self.store.get(sos_id).await?;
        let (old_status, snapshot) = {
            let mut record = entry_lock.write().await;
            let old_status = record.status;

            if !matches!(new_status, SosStatus::Resolved | SosStatus::Cancelled)
                || !old_status.can_transition_to(new_status)
            {
                return Err(GatewayError::InvalidTransition {
                    from: old_status.to_string(),
                    to: new_status.to_string(),
                });
            }

            let authorized = actor.role == Role::Admin
                || record.is_assigned_volunteer(&actor.id)
                || record.is_requester(&actor.id);
            if !authorized {
                return Err(GatewayError::Forbidden(
                    "only admin, assigned volunteer, or requester may update status".to_string(),
                ));
            }

            let now = Utc::now();
            record.status = new_status;
            record.updated_at = now;
            match new_status {
                SosStatus::Resolved => record.resolved_at = Some(now),
                SosStatus::Cancelled => record.cancelled_at = Some(now),
                SosStatus::Pending | SosStatus::InProgress => {}
            }
            (old_status, record.clone())
        };

        if old_status == SosStatus::Pending {
            self.store
                .remove_from_pending_index(sos_id, &snapshot.location)
                .await;
        }

        let event = SosEvent::SosStatusChanged {
            sos_id,
            old_status,
            new_status,
            requester_id: snapshot.requester_id.clone(),
            volunteer_id: snapshot.volunteer_id.clone(),
            actor: ActorRef {
                id: actor.id.clone(),
                name: actor.name.clone(),
                role: actor.role,
            },
            updated_at: snapshot.updated_at,
        };
        self.persist(&event, Some(&snapshot));
        let _ = self.event_bus.publish(event);

        tracing::info!(%sos_id, %old_status, %new_status, actor_id = %actor.id, "sos status updated");
        Ok(snapshot)
    }

    /// Returns the record if `actor` is the requester, the assigned
    /// volunteer, or an admin.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or [`GatewayError::Forbidden`].
    pub async fn get(&self, sos_id: SosId, actor: &Identity) -> Result<SosRequest, GatewayError> {
        let entry_lock = self.store.get(sos_id).await?;
        let record = entry_lock.read().await;

        let allowed = actor.role == Role::Admin
            || record.is_requester(&actor.id)
            || record.is_assigned_volunteer(&actor.id);
        if !allowed {
            return Err(GatewayError::Forbidden(
                "you can only view your own sos requests".to_string(),
            ));
        }
        Ok(record.clone())
    }

    /// Pending requests within `max_distance_m` of `point`, nearest
    /// first, with computed distances. `limit` is clamped to the
    /// default cap of 50.
    pub async fn find_nearby_pending(
        &self,
        point: GeoPoint,
        max_distance_m: f64,
        limit: Option<usize>,
    ) -> Vec<(SosRequest, f64)> {
        let limit = limit
            .unwrap_or(DEFAULT_NEARBY_LIMIT)
            .clamp(1, DEFAULT_NEARBY_LIMIT);
        self.store
            .find_nearby_pending(&point, max_distance_m, limit)
            .await
    }

    /// All requests created by `requester_id`, newest first.
    pub async fn list_for_requester(&self, requester_id: &str) -> Vec<SosRequest> {
        self.store.list_for_requester(requester_id).await
    }

    /// Mirrors the event (and optionally the record) into Postgres,
    /// best-effort on a detached task. Persistence success is causally
    /// independent of the caller's result.
    fn persist(&self, event: &SosEvent, record: Option<&SosRequest>) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        let persistence = Arc::clone(persistence);
        let event = event.clone();
        let record = record.cloned();
        tokio::spawn(async move {
            if let Err(e) = persistence.append_event(&event).await {
                tracing::warn!(error = %e, "event log append failed");
            }
            if let Some(record) = record
                && let Err(e) = persistence.upsert_sos(&record).await
            {
                tracing::warn!(error = %e, "sos mirror upsert failed");
            }
        });
    }
}
