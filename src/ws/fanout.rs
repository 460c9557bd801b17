//! Event fan-out router.
//!
//! A single task subscribes to the event bus, maps each lifecycle event
//! to a set of (group, frame) deliveries according to the routing
//! table, resolves groups against the presence registry, and forwards
//! pre-serialized frames over each member's channel handle. Delivery is
//! fire-and-forget: a closed or saturated channel is skipped, never
//! retried, and never affects the lifecycle operation that emitted the
//! event.
//!
//! Routing table:
//!
//! | Event              | Recipients                                              |
//! |--------------------|---------------------------------------------------------|
//! | `sos_created`      | volunteers (full record), admins (summary)              |
//! | `sos_accepted`     | volunteers (drop from lists), requester (targeted)      |
//! | `sos_status_changed` | everyone (audit), requester and assigned volunteer (targeted) |

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::messages::WsMessage;
use crate::domain::{EventBus, SosEvent};
use crate::presence::{Group, PresenceRegistry};

/// Maps lifecycle events to recipient groups and delivers frames.
#[derive(Debug, Clone)]
pub struct FanoutRouter {
    presence: Arc<PresenceRegistry>,
}

impl FanoutRouter {
    /// Creates a router over the given presence registry.
    #[must_use]
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self { presence }
    }

    /// Spawns the fan-out loop on a dedicated task.
    ///
    /// The loop runs until the event bus is dropped. A lagged receiver
    /// logs and resubscribes at the current position; missed events are
    /// not replayed.
    pub fn spawn(self, event_bus: &EventBus) -> JoinHandle<()> {
        let mut rx = event_bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.route_event(&event).await,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "fanout receiver lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("fanout loop stopped");
        })
    }

    /// Routes one event: builds the delivery rows and sends each frame
    /// to every current member of the row's group.
    pub async fn route_event(&self, event: &SosEvent) {
        for (group, message) in Self::deliveries(event) {
            let frame = message.to_frame();
            let members = self.presence.members_of(&group).await;
            let mut delivered = 0_usize;
            for handle in &members {
                // Closed channel: the connection is tearing down.
                if handle.send(frame.clone()).is_ok() {
                    delivered += 1;
                }
            }
            tracing::debug!(
                event_type = event.event_type_str(),
                group = %group,
                delivered,
                "event routed"
            );
        }
    }

    /// The routing table: which groups see which view of the event.
    fn deliveries(event: &SosEvent) -> Vec<(Group, WsMessage)> {
        match event {
            SosEvent::SosCreated { sos } => vec![
                (
                    Group::Volunteers,
                    WsMessage::event(json!({
                        "event_type": "sos_created",
                        "sos": sos,
                    })),
                ),
                (
                    Group::Admins,
                    WsMessage::event(json!({
                        "event_type": "sos_created",
                        "sos_id": sos.id,
                        "sos_type": sos.sos_type,
                        "location": sos.location,
                        "requester_name": sos.requester_name,
                        "created_at": sos.created_at,
                    })),
                ),
            ],
            SosEvent::SosAccepted {
                sos_id,
                volunteer_id,
                volunteer_name,
                requester_id,
                accepted_at,
            } => vec![
                (
                    Group::Volunteers,
                    WsMessage::event(json!({
                        "event_type": "sos_accepted",
                        "sos_id": sos_id,
                        "volunteer_id": volunteer_id,
                        "accepted_at": accepted_at,
                    })),
                ),
                (
                    Group::User(requester_id.clone()),
                    WsMessage::event(json!({
                        "event_type": "your_sos_accepted",
                        "sos_id": sos_id,
                        "volunteer_name": volunteer_name,
                        "accepted_at": accepted_at,
                    })),
                ),
            ],
            SosEvent::SosStatusChanged {
                sos_id,
                old_status,
                new_status,
                requester_id,
                volunteer_id,
                actor,
                updated_at,
            } => {
                let mut rows = vec![
                    (
                        Group::Everyone,
                        WsMessage::event(json!({
                            "event_type": "sos_status_changed",
                            "sos_id": sos_id,
                            "old_status": old_status,
                            "new_status": new_status,
                            "actor": actor,
                            "updated_at": updated_at,
                        })),
                    ),
                    (
                        Group::User(requester_id.clone()),
                        WsMessage::event(json!({
                            "event_type": "your_sos_updated",
                            "sos_id": sos_id,
                            "new_status": new_status,
                            "updated_at": updated_at,
                        })),
                    ),
                ];
                if let Some(volunteer_id) = volunteer_id {
                    rows.push((
                        Group::User(volunteer_id.clone()),
                        WsMessage::event(json!({
                            "event_type": "assigned_sos_updated",
                            "sos_id": sos_id,
                            "new_status": new_status,
                            "updated_at": updated_at,
                        })),
                    ));
                }
                rows
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::{Identity, Role};
    use crate::domain::{ActorRef, GeoPoint, SosRequest, SosStatus, SosType};
    use tokio::sync::mpsc;

    fn identity(id: &str, role: Role) -> Identity {
        Identity {
            id: id.to_string(),
            role,
            name: format!("name-{id}"),
        }
    }

    fn make_sos(requester_id: &str) -> SosRequest {
        let Ok(location) = GeoPoint::new(77.21, 28.61) else {
            panic!("valid point");
        };
        SosRequest::new(
            requester_id.to_string(),
            "Asha".to_string(),
            SosType::Medical,
            Some("need help".to_string()),
            location,
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    async fn wired_registry() -> (
        Arc<PresenceRegistry>,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let presence = Arc::new(PresenceRegistry::new());
        let (vol_tx, vol_rx) = mpsc::unbounded_channel();
        let (adm_tx, adm_rx) = mpsc::unbounded_channel();
        let (usr_tx, usr_rx) = mpsc::unbounded_channel();
        presence
            .register(&identity("vol-1", Role::Volunteer), vol_tx)
            .await;
        presence.register(&identity("adm-1", Role::Admin), adm_tx).await;
        presence.register(&identity("usr-1", Role::User), usr_tx).await;
        (presence, vol_rx, adm_rx, usr_rx)
    }

    #[tokio::test]
    async fn created_goes_to_volunteers_and_admins() {
        let (presence, mut vol_rx, mut adm_rx, mut usr_rx) = wired_registry().await;
        let router = FanoutRouter::new(presence);

        let sos = make_sos("usr-1");
        router
            .route_event(&SosEvent::SosCreated { sos: sos.clone() })
            .await;

        let vol_frames = drain(&mut vol_rx);
        assert_eq!(vol_frames.len(), 1);
        let Some(vol_frame) = vol_frames.first() else {
            panic!("expected volunteer frame");
        };
        // Volunteers see the full record.
        assert!(vol_frame.contains("need help"));

        let adm_frames = drain(&mut adm_rx);
        assert_eq!(adm_frames.len(), 1);
        let Some(adm_frame) = adm_frames.first() else {
            panic!("expected admin frame");
        };
        // Admins get the summary only.
        assert!(adm_frame.contains("sos_created"));
        assert!(!adm_frame.contains("need help"));

        // The requester is not notified of their own creation.
        assert!(drain(&mut usr_rx).is_empty());
    }

    #[tokio::test]
    async fn accepted_goes_to_volunteers_and_requester() {
        let (presence, mut vol_rx, mut adm_rx, mut usr_rx) = wired_registry().await;
        let router = FanoutRouter::new(presence);

        let sos = make_sos("usr-1");
        router
            .route_event(&SosEvent::SosAccepted {
                sos_id: sos.id,
                volunteer_id: "vol-1".to_string(),
                volunteer_name: "Ravi".to_string(),
                requester_id: "usr-1".to_string(),
                accepted_at: chrono::Utc::now(),
            })
            .await;

        assert_eq!(drain(&mut vol_rx).len(), 1);
        assert!(drain(&mut adm_rx).is_empty());

        let usr_frames = drain(&mut usr_rx);
        assert_eq!(usr_frames.len(), 1);
        let Some(usr_frame) = usr_frames.first() else {
            panic!("expected requester frame");
        };
        assert!(usr_frame.contains("your_sos_accepted"));
        assert!(usr_frame.contains("Ravi"));
    }

    #[tokio::test]
    async fn status_change_broadcasts_and_targets() {
        let (presence, mut vol_rx, mut adm_rx, mut usr_rx) = wired_registry().await;
        let router = FanoutRouter::new(presence);

        let sos = make_sos("usr-1");
        router
            .route_event(&SosEvent::SosStatusChanged {
                sos_id: sos.id,
                old_status: SosStatus::InProgress,
                new_status: SosStatus::Resolved,
                requester_id: "usr-1".to_string(),
                volunteer_id: Some("vol-1".to_string()),
                actor: ActorRef {
                    id: "usr-1".to_string(),
                    name: "Asha".to_string(),
                    role: Role::User,
                },
                updated_at: chrono::Utc::now(),
            })
            .await;

        // Admin gets the audit broadcast only.
        assert_eq!(drain(&mut adm_rx).len(), 1);

        // The assigned volunteer gets the audit frame plus its targeted frame.
        let vol_frames = drain(&mut vol_rx);
        assert_eq!(vol_frames.len(), 2);
        assert!(vol_frames.iter().any(|f| f.contains("assigned_sos_updated")));

        // The requester likewise.
        let usr_frames = drain(&mut usr_rx);
        assert_eq!(usr_frames.len(), 2);
        assert!(usr_frames.iter().any(|f| f.contains("your_sos_updated")));
    }

    #[tokio::test]
    async fn closed_channel_is_skipped_silently() {
        let presence = Arc::new(PresenceRegistry::new());
        let (vol_tx, vol_rx) = mpsc::unbounded_channel();
        presence
            .register(&identity("vol-1", Role::Volunteer), vol_tx)
            .await;
        drop(vol_rx);

        let router = FanoutRouter::new(presence);
        // Must not panic or error.
        router
            .route_event(&SosEvent::SosCreated {
                sos: make_sos("usr-1"),
            })
            .await;
    }

    #[tokio::test]
    async fn spawned_loop_forwards_bus_events() {
        let presence = Arc::new(PresenceRegistry::new());
        let (vol_tx, mut vol_rx) = mpsc::unbounded_channel();
        presence
            .register(&identity("vol-1", Role::Volunteer), vol_tx)
            .await;

        let event_bus = EventBus::new(16);
        let handle = FanoutRouter::new(presence).spawn(&event_bus);

        let _ = event_bus.publish(SosEvent::SosCreated {
            sos: make_sos("usr-1"),
        });

        let frame = vol_rx.recv().await;
        let Some(frame) = frame else {
            panic!("expected a forwarded frame");
        };
        assert!(frame.contains("sos_created"));
        handle.abort();
    }
}
