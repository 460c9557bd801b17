//! Concurrent SOS storage with per-record locking and a pending-request
//! spatial index.
//!
//! [`SosStore`] keeps every record in a `HashMap` where each entry is
//! individually protected by a [`tokio::sync::RwLock`]; the
//! `Pending -> InProgress` claim is applied under the record's write
//! lock so at most one acceptance can succeed. Alongside the map, an
//! R-tree over unit-sphere coordinates indexes Pending requests only,
//! backing the nearest-neighbor query on the volunteer refresh path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rstar::RTree;
use rstar::primitives::GeomWithData;
use tokio::sync::RwLock;

use super::geo::{GeoPoint, chord_for_arc_m};
use super::sos_id::SosId;
use super::sos_request::{SosRequest, SosStatus};
use crate::error::GatewayError;

/// Spatial index entry: unit-sphere coordinates tagged with the record id.
type PendingLocation = GeomWithData<[f64; 3], SosId>;

/// Default cap on nearby query results.
pub const DEFAULT_NEARBY_LIMIT: usize = 50;

/// Central store for all SOS requests.
///
/// # Concurrency
///
/// - Multiple tasks may read the same record concurrently.
/// - Writes to different records are concurrent.
/// - Writes to the same record are serialized; no global lock is held
///   across a record mutation.
///
/// The spatial index is maintained after the record mutation commits,
/// so it may briefly lag a record that just left `Pending`; readers
/// re-check the record status and never trust the index alone.
pub struct SosStore {
    records: RwLock<HashMap<SosId, Arc<RwLock<SosRequest>>>>,
    pending_index: RwLock<RTree<PendingLocation>>,
}

impl SosStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            pending_index: RwLock::new(RTree::new()),
        }
    }

    /// Inserts a newly created record and indexes its location.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if a record with the same ID
    /// already exists (should never happen with UUID v4).
    pub async fn insert(&self, request: SosRequest) -> Result<SosId, GatewayError> {
        let id = request.id;
        let location = request.location;
        {
            let mut map = self.records.write().await;
            if map.contains_key(&id) {
                return Err(GatewayError::Internal(format!(
                    "sos request {id} already exists"
                )));
            }
            map.insert(id, Arc::new(RwLock::new(request)));
        }
        let mut index = self.pending_index.write().await;
        index.insert(GeomWithData::new(location.to_unit_sphere(), id));
        Ok(id)
    }

    /// Returns a shared reference to the record behind its per-record lock.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if no record with the given ID
    /// exists.
    pub async fn get(&self, id: SosId) -> Result<Arc<RwLock<SosRequest>>, GatewayError> {
        let map = self.records.read().await;
        map.get(&id).cloned().ok_or(GatewayError::NotFound(id))
    }

    /// Drops a record from the pending index after it left `Pending`.
    ///
    /// Idempotent: removing an absent entry is a no-op.
    pub async fn remove_from_pending_index(&self, id: SosId, location: &GeoPoint) {
        let mut index = self.pending_index.write().await;
        index.remove(&GeomWithData::new(location.to_unit_sphere(), id));
    }

    /// Pending requests within `max_distance_m` meters of `point`,
    /// nearest first, ties broken by earliest creation, capped at `limit`.
    ///
    /// Each result carries the computed great-circle distance in meters.
    /// Backed by the R-tree nearest-neighbor iterator; chord distance on
    /// the unit sphere is monotonic in great-circle distance, so the
    /// iterator can stop at the first candidate beyond the radius.
    pub async fn find_nearby_pending(
        &self,
        point: &GeoPoint,
        max_distance_m: f64,
        limit: usize,
    ) -> Vec<(SosRequest, f64)> {
        let query = point.to_unit_sphere();
        let chord = chord_for_arc_m(max_distance_m.max(0.0));
        let chord_2 = chord * chord;

        let candidate_ids: Vec<SosId> = {
            let index = self.pending_index.read().await;
            index
                .nearest_neighbor_iter_with_distance_2(&query)
                .take_while(|(_, dist_2)| *dist_2 <= chord_2)
                .map(|(entry, _)| entry.data)
                .collect()
        };

        let mut matches = Vec::with_capacity(candidate_ids.len().min(limit));
        {
            let map = self.records.read().await;
            for id in candidate_ids {
                let Some(entry_lock) = map.get(&id) else {
                    continue;
                };
                let record = entry_lock.read().await;
                // Index may lag a record that just left Pending.
                if record.status != SosStatus::Pending {
                    continue;
                }
                let distance = point.distance_m(&record.location);
                matches.push((record.clone(), distance));
            }
        }

        matches.sort_by(|(a, da), (b, db)| {
            da.partial_cmp(db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        matches.truncate(limit);
        matches
    }

    /// All records created by `requester_id`, newest first.
    pub async fn list_for_requester(&self, requester_id: &str) -> Vec<SosRequest> {
        let map = self.records.read().await;
        let mut items = Vec::new();
        for entry_lock in map.values() {
            let record = entry_lock.read().await;
            if record.requester_id == requester_id {
                items.push(record.clone());
            }
        }
        drop(map);
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if the store contains no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Returns the number of entries in the pending index.
    pub async fn pending_index_len(&self) -> usize {
        self.pending_index.read().await.size()
    }
}

impl Default for SosStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SosStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SosStore").finish_non_exhaustive()
    }
}
