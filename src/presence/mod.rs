//! Presence registry: who currently holds an open real-time channel.
//!
//! Purely in-memory routing state, owned by the process lifetime and
//! injected wherever it is needed (never a module-level global). It is
//! rebuilt from scratch after a restart and is **never** consulted for
//! authorization; the lifecycle engine decides permissions from the
//! record and the identity assertion alone.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};

use crate::auth::{Identity, Role};
use crate::domain::GeoPoint;

/// Outbound handle for one open channel. Frames are pre-serialized by
/// the fan-out router; the connection loop only forwards them.
pub type ChannelHandle = mpsc::UnboundedSender<String>;

/// Addressable recipient groups.
///
/// Memberships are derived from the entry role: every volunteer is in
/// [`Group::Volunteers`], every admin in [`Group::Admins`], and every
/// identity in its own `user:{id}` group for direct addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Group {
    /// All connected volunteers.
    Volunteers,
    /// All connected admins.
    Admins,
    /// A single identity, regardless of role.
    User(String),
    /// Every connected channel (status audit broadcasts).
    Everyone,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volunteers => write!(f, "volunteers"),
            Self::Admins => write!(f, "admins"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::Everyone => write!(f, "everyone"),
        }
    }
}

/// One connected identity.
#[derive(Debug)]
struct PresenceEntry {
    role: Role,
    display_name: String,
    handle: ChannelHandle,
    location: Option<GeoPoint>,
    connected_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Serializable view of a presence entry (admin listing).
#[derive(Debug, Clone, Serialize)]
pub struct PresenceSnapshot {
    /// Identity id of the connected user.
    pub identity_id: String,
    /// Role of the connected user.
    pub role: Role,
    /// Display name.
    pub display_name: String,
    /// Last known location, if the client has checked in.
    pub location: Option<GeoPoint>,
    /// Channel open timestamp.
    pub connected_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_seen: DateTime<Utc>,
}

/// In-memory directory of open channels, keyed by identity id.
///
/// At most one entry per identity: a reconnect replaces the prior
/// entry (last write wins). Concurrent mutation is safe; cross-identity
/// operations need no coordination beyond the map lock.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, PresenceEntry>>,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for the identity.
    pub async fn register(&self, identity: &Identity, handle: ChannelHandle) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.insert(
            identity.id.clone(),
            PresenceEntry {
                role: identity.role,
                display_name: identity.name.clone(),
                handle,
                location: None,
                connected_at: now,
                last_seen: now,
            },
        );
    }

    /// Records an explicit location check-in.
    ///
    /// No-op when the identity has no open channel.
    pub async fn update_location(&self, identity_id: &str, point: GeoPoint) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(identity_id) {
            entry.location = Some(point);
            entry.last_seen = Utc::now();
        }
    }

    /// Removes the entry for the identity. Idempotent.
    pub async fn unregister(&self, identity_id: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(identity_id);
    }

    /// Removes the entry only if it still belongs to `handle`.
    ///
    /// Connection teardown uses this so a stale close cannot clobber
    /// the entry written by a newer connection of the same identity.
    pub async fn unregister_channel(&self, identity_id: &str, handle: &ChannelHandle) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(identity_id)
            && entry.handle.same_channel(handle)
        {
            entries.remove(identity_id);
        }
    }

    /// Channel handles of all current members of `group`.
    pub async fn members_of(&self, group: &Group) -> Vec<ChannelHandle> {
        let entries = self.entries.read().await;
        match group {
            Group::Volunteers => entries
                .values()
                .filter(|e| e.role == Role::Volunteer)
                .map(|e| e.handle.clone())
                .collect(),
            Group::Admins => entries
                .values()
                .filter(|e| e.role == Role::Admin)
                .map(|e| e.handle.clone())
                .collect(),
            Group::User(id) => entries
                .get(id)
                .map(|e| vec![e.handle.clone()])
                .unwrap_or_default(),
            Group::Everyone => entries.values().map(|e| e.handle.clone()).collect(),
        }
    }

    /// Serializable listing of all connected identities.
    pub async fn snapshot(&self) -> Vec<PresenceSnapshot> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(id, e)| PresenceSnapshot {
                identity_id: id.clone(),
                role: e.role,
                display_name: e.display_name.clone(),
                location: e.location,
                connected_at: e.connected_at,
                last_seen: e.last_seen,
            })
            .collect()
    }

    /// Number of open channels.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no channel is open.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn identity(id: &str, role: Role) -> Identity {
        Identity {
            id: id.to_string(),
            role,
            name: format!("name-{id}"),
        }
    }

    fn handle() -> (ChannelHandle, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn register_derives_group_memberships() {
        let registry = PresenceRegistry::new();
        let (vol_tx, _vol_rx) = handle();
        let (adm_tx, _adm_rx) = handle();
        let (usr_tx, _usr_rx) = handle();
        registry.register(&identity("v-1", Role::Volunteer), vol_tx).await;
        registry.register(&identity("a-1", Role::Admin), adm_tx).await;
        registry.register(&identity("u-1", Role::User), usr_tx).await;

        assert_eq!(registry.members_of(&Group::Volunteers).await.len(), 1);
        assert_eq!(registry.members_of(&Group::Admins).await.len(), 1);
        assert_eq!(
            registry
                .members_of(&Group::User("u-1".to_string()))
                .await
                .len(),
            1
        );
        assert_eq!(registry.members_of(&Group::Everyone).await.len(), 3);
    }

    #[tokio::test]
    async fn reconnect_replaces_entry() {
        let registry = PresenceRegistry::new();
        let (old_tx, _old_rx) = handle();
        let (new_tx, mut new_rx) = handle();
        let id = identity("v-1", Role::Volunteer);
        registry.register(&id, old_tx).await;
        registry.register(&id, new_tx).await;

        assert_eq!(registry.len().await, 1);
        let handles = registry.members_of(&Group::Volunteers).await;
        let Some(h) = handles.first() else {
            panic!("expected one handle");
        };
        assert!(h.send("ping".to_string()).is_ok());
        assert_eq!(new_rx.recv().await.as_deref(), Some("ping"));
    }

    #[tokio::test]
    async fn stale_close_does_not_clobber_reconnect() {
        let registry = PresenceRegistry::new();
        let (old_tx, _old_rx) = handle();
        let (new_tx, _new_rx) = handle();
        let id = identity("v-1", Role::Volunteer);
        registry.register(&id, old_tx.clone()).await;
        registry.register(&id, new_tx).await;

        // Old connection tears down after the reconnect already registered.
        registry.unregister_channel("v-1", &old_tx).await;
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = PresenceRegistry::new();
        let (tx, _rx) = handle();
        registry.register(&identity("u-1", Role::User), tx).await;
        registry.unregister("u-1").await;
        registry.unregister("u-1").await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn update_location_requires_open_channel() {
        let registry = PresenceRegistry::new();
        let Ok(point) = GeoPoint::new(77.21, 28.61) else {
            panic!("valid point");
        };
        // No entry: silently ignored.
        registry.update_location("ghost", point).await;
        assert!(registry.is_empty().await);

        let (tx, _rx) = handle();
        registry.register(&identity("v-1", Role::Volunteer), tx).await;
        registry.update_location("v-1", point).await;

        let snapshot = registry.snapshot().await;
        let Some(entry) = snapshot.first() else {
            panic!("expected entry");
        };
        assert_eq!(entry.location, Some(point));
    }

    #[tokio::test]
    async fn members_of_unknown_user_is_empty() {
        let registry = PresenceRegistry::new();
        assert!(
            registry
                .members_of(&Group::User("nobody".to_string()))
                .await
                .is_empty()
        );
    }
}
