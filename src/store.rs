//! Trajectory storage.
//!
//! [`TrajectoryStore`] is the boundary to whatever persists walk samples and
//! simplified polylines (the production backend keeps them in PostGIS).
//! [`MemoryStore`] is an in-process implementation used by tests, demos and
//! the mobile app's offline mode.
//!
//! Implementations must make [`TrajectoryStore::replace_simplified`] a single
//! atomic replace and serialize concurrent writes for the same session.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StoreError;
use crate::{SampleId, SessionId, SimplifiedPolyline, StoredSample, TrajectorySample};

/// Persistence for trajectory samples and simplified polylines.
pub trait TrajectoryStore: Send + Sync {
    /// Persist samples, returning their assigned ids in input order.
    fn append_samples(&self, samples: &[TrajectorySample]) -> Result<Vec<SampleId>, StoreError>;

    /// All samples of a session, ordered by `order` ascending.
    fn session_samples(&self, session_id: SessionId) -> Result<Vec<StoredSample>, StoreError>;

    /// Every stored sample, ordered by session then `order`.
    fn all_samples(&self) -> Result<Vec<StoredSample>, StoreError>;

    /// Replace a sample's order and position. Returns `false` if the id is unknown.
    fn update_sample(&self, id: SampleId, sample: &TrajectorySample) -> Result<bool, StoreError>;

    /// Delete one sample. Returns `false` if the id is unknown.
    fn delete_sample(&self, id: SampleId) -> Result<bool, StoreError>;

    /// Delete every sample of a session, returning how many were removed.
    fn clear_session(&self, session_id: SessionId) -> Result<usize, StoreError>;

    /// Overwrite the session's simplified polyline.
    fn replace_simplified(&self, polyline: &SimplifiedPolyline) -> Result<(), StoreError>;

    /// The session's current simplified polyline, if one was stored.
    fn simplified(&self, session_id: SessionId) -> Result<Option<SimplifiedPolyline>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: SampleId,
    /// Samples per session, kept sorted by `order`
    samples: HashMap<SessionId, Vec<StoredSample>>,
    /// Sample id -> owning session
    owners: HashMap<SampleId, SessionId>,
    simplified: HashMap<SessionId, SimplifiedPolyline>,
}

impl MemoryState {
    fn insert(&mut self, sample: TrajectorySample) -> Result<SampleId, StoreError> {
        let id = self.next_id + 1;
        self.place(id, sample)?;
        self.next_id = id;
        Ok(id)
    }

    fn place(&mut self, id: SampleId, sample: TrajectorySample) -> Result<(), StoreError> {
        let session = self.samples.entry(sample.session_id).or_default();
        match session.binary_search_by_key(&sample.order, |s| s.sample.order) {
            Ok(_) => Err(StoreError::DuplicateOrder {
                session_id: sample.session_id,
                order: sample.order,
            }),
            Err(position) => {
                session.insert(position, StoredSample { id, sample });
                self.owners.insert(id, sample.session_id);
                Ok(())
            }
        }
    }

    fn has_order(&self, session_id: SessionId, order: i64) -> bool {
        self.samples
            .get(&session_id)
            .is_some_and(|s| s.binary_search_by_key(&order, |s| s.sample.order).is_ok())
    }

    fn remove(&mut self, id: SampleId) -> Option<StoredSample> {
        let session_id = self.owners.remove(&id)?;
        let session = self.samples.get_mut(&session_id)?;
        let position = session.iter().position(|s| s.id == id)?;
        let removed = session.remove(position);
        if session.is_empty() {
            self.samples.remove(&session_id);
        }
        Some(removed)
    }
}

/// Thread-safe in-memory [`TrajectoryStore`].
///
/// A single lock guards all state, so every write (including the polyline
/// replace) is atomic and writes to the same session are serialized.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one sample.
    pub fn session_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.samples.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl TrajectoryStore for MemoryStore {
    fn append_samples(&self, samples: &[TrajectorySample]) -> Result<Vec<SampleId>, StoreError> {
        let mut state = self.write()?;

        // Validate the whole batch first so a rejected batch writes nothing
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in samples {
            if state.has_order(sample.session_id, sample.order)
                || !seen.insert((sample.session_id, sample.order))
            {
                return Err(StoreError::DuplicateOrder {
                    session_id: sample.session_id,
                    order: sample.order,
                });
            }
        }

        samples.iter().map(|sample| state.insert(*sample)).collect()
    }

    fn session_samples(&self, session_id: SessionId) -> Result<Vec<StoredSample>, StoreError> {
        Ok(self.read()?.samples.get(&session_id).cloned().unwrap_or_default())
    }

    fn all_samples(&self) -> Result<Vec<StoredSample>, StoreError> {
        let state = self.read()?;
        let mut session_ids: Vec<SessionId> = state.samples.keys().copied().collect();
        session_ids.sort_unstable();

        Ok(session_ids
            .iter()
            .filter_map(|id| state.samples.get(id))
            .flat_map(|samples| samples.iter().copied())
            .collect())
    }

    fn update_sample(&self, id: SampleId, sample: &TrajectorySample) -> Result<bool, StoreError> {
        let mut state = self.write()?;

        let Some(previous) = state.remove(id) else {
            return Ok(false);
        };

        // Put the old sample back if the new order collides
        match state.place(id, *sample) {
            Ok(()) => Ok(true),
            Err(e) => {
                state.place(id, previous.sample)?;
                Err(e)
            }
        }
    }

    fn delete_sample(&self, id: SampleId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(id).is_some())
    }

    fn clear_session(&self, session_id: SessionId) -> Result<usize, StoreError> {
        let mut state = self.write()?;
        let removed = state.samples.remove(&session_id).unwrap_or_default();
        for sample in &removed {
            state.owners.remove(&sample.id);
        }
        Ok(removed.len())
    }

    fn replace_simplified(&self, polyline: &SimplifiedPolyline) -> Result<(), StoreError> {
        self.write()?
            .simplified
            .insert(polyline.session_id, polyline.clone());
        Ok(())
    }

    fn simplified(&self, session_id: SessionId) -> Result<Option<SimplifiedPolyline>, StoreError> {
        Ok(self.read()?.simplified.get(&session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn sample(session_id: SessionId, order: i64) -> TrajectorySample {
        TrajectorySample::new(
            session_id,
            order,
            GpsPoint::new(-23.5505 - order as f64 * 0.0001, -46.6333),
        )
    }

    #[test]
    fn test_append_and_list_ordered() {
        let store = MemoryStore::new();
        let ids = store
            .append_samples(&[sample(39, 3), sample(39, 1), sample(40, 1), sample(39, 2)])
            .unwrap();
        assert_eq!(ids.len(), 4);

        let orders: Vec<i64> = store
            .session_samples(39)
            .unwrap()
            .iter()
            .map(|s| s.sample.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(store.session_samples(40).unwrap().len(), 1);
        assert!(store.session_samples(41).unwrap().is_empty());
        assert_eq!(store.session_count().unwrap(), 2);
    }

    #[test]
    fn test_all_samples_ordered_by_session_then_order() {
        let store = MemoryStore::new();
        store
            .append_samples(&[sample(40, 2), sample(39, 2), sample(40, 1), sample(39, 1)])
            .unwrap();

        let keys: Vec<(SessionId, i64)> = store
            .all_samples()
            .unwrap()
            .iter()
            .map(|s| (s.sample.session_id, s.sample.order))
            .collect();
        assert_eq!(keys, vec![(39, 1), (39, 2), (40, 1), (40, 2)]);
    }

    #[test]
    fn test_duplicate_order_rejects_whole_batch() {
        let store = MemoryStore::new();
        store.append_samples(&[sample(39, 1)]).unwrap();

        let err = store.append_samples(&[sample(39, 2), sample(39, 1)]).unwrap_err();
        assert_eq!(err, StoreError::DuplicateOrder { session_id: 39, order: 1 });
        assert_eq!(store.session_samples(39).unwrap().len(), 1);

        let err = store.append_samples(&[sample(40, 5), sample(40, 5)]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrder { session_id: 40, order: 5 }));
        assert!(store.session_samples(40).unwrap().is_empty());
    }

    #[test]
    fn test_update_sample_keeps_id_and_reorders() {
        let store = MemoryStore::new();
        let ids = store.append_samples(&[sample(39, 10), sample(39, 20)]).unwrap();

        let moved = TrajectorySample::new(39, 30, GpsPoint::new(-23.57, -46.65));
        assert!(store.update_sample(ids[0], &moved).unwrap());

        let samples = store.session_samples(39).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].id, ids[0]);
        assert_eq!(samples[1].sample, moved);

        assert!(!store.update_sample(999, &moved).unwrap());
    }

    #[test]
    fn test_update_sample_collision_restores_original() {
        let store = MemoryStore::new();
        let ids = store.append_samples(&[sample(39, 10), sample(39, 20)]).unwrap();

        let err = store.update_sample(ids[0], &sample(39, 20)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrder { .. }));

        let samples = store.session_samples(39).unwrap();
        assert_eq!(samples[0].id, ids[0]);
        assert_eq!(samples[0].sample, sample(39, 10));
        // The restored sample can still be deleted by its id
        assert!(store.delete_sample(ids[0]).unwrap());
    }

    #[test]
    fn test_delete_and_clear() {
        let store = MemoryStore::new();
        let ids = store
            .append_samples(&[sample(40, 20), sample(40, 30), sample(40, 31)])
            .unwrap();

        assert!(store.delete_sample(ids[0]).unwrap());
        assert!(!store.delete_sample(ids[0]).unwrap());
        assert_eq!(store.session_samples(40).unwrap().len(), 2);

        assert_eq!(store.clear_session(40).unwrap(), 2);
        assert!(store.session_samples(40).unwrap().is_empty());
        assert_eq!(store.clear_session(40).unwrap(), 0);
        assert!(!store.delete_sample(ids[1]).unwrap());
    }

    #[test]
    fn test_replace_simplified_overwrites() {
        let store = MemoryStore::new();
        assert_eq!(store.simplified(39).unwrap(), None);

        let first = SimplifiedPolyline::new(39, vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)]);
        let second = SimplifiedPolyline::new(39, vec![GpsPoint::new(1.0, 0.0), GpsPoint::new(1.0, 1.0)]);

        store.replace_simplified(&first).unwrap();
        store.replace_simplified(&second).unwrap();
        assert_eq!(store.simplified(39).unwrap(), Some(second));
        assert_eq!(store.simplified(40).unwrap(), None);
    }
}
