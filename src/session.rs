//! Session-level simplification.
//!
//! [`simplify_session`] fetches a walk's samples from a [`TrajectoryStore`],
//! reduces them, and atomically replaces the session's stored polyline.
//! [`TrajectoryService`] wraps a store and a default [`SimplifyConfig`] behind
//! the operations the REST endpoints expose.

use std::time::Instant;

use log::{debug, info, warn};

use crate::error::{StoreError, TrajectoryError};
use crate::simplify;
use crate::store::TrajectoryStore;
use crate::{
    GpsPoint, SampleId, SessionId, SimplifiedPolyline, SimplifyConfig, StoredSample,
    TrajectorySample,
};

/// Simplify one session's trajectory and persist the result.
///
/// Uses `config.epsilon_meters` as the tolerance. Exactly one polyline
/// replace is issued on success; nothing is written on error.
///
/// # Errors
///
/// - [`TrajectoryError::InvalidTolerance`] if the tolerance is negative, NaN or infinite
/// - [`TrajectoryError::NoTrajectoryData`] if the session has no samples
/// - [`TrajectoryError::TooManyPoints`] if `config.max_points` is exceeded
/// - [`TrajectoryError::DegenerateResult`] if fewer than 2 points remain
/// - [`TrajectoryError::Storage`] for any store failure, unchanged
pub fn simplify_session<S: TrajectoryStore + ?Sized>(
    store: &S,
    session_id: SessionId,
    config: &SimplifyConfig,
) -> Result<SimplifiedPolyline, TrajectoryError> {
    let epsilon = config.epsilon_meters;
    if !epsilon.is_finite() || epsilon < 0.0 {
        warn!("[TrajectoryService] session {}: rejecting tolerance {}", session_id, epsilon);
        return Err(TrajectoryError::InvalidTolerance(epsilon));
    }

    let start = Instant::now();

    let samples = store.session_samples(session_id)?;
    if samples.is_empty() {
        return Err(TrajectoryError::NoTrajectoryData { session_id });
    }

    if let Some(limit) = config.max_points {
        let limit = limit as usize;
        if samples.len() > limit {
            warn!(
                "[TrajectoryService] session {}: {} samples exceeds limit {}",
                session_id,
                samples.len(),
                limit
            );
            return Err(TrajectoryError::TooManyPoints {
                session_id,
                point_count: samples.len(),
                limit,
            });
        }
    }

    let points: Vec<GpsPoint> = samples.iter().map(|s| s.sample.point).collect();
    let simplified = simplify::simplify_with_config(&points, config);

    if simplified.len() < 2 {
        return Err(TrajectoryError::DegenerateResult {
            session_id,
            point_count: simplified.len(),
        });
    }

    let polyline = SimplifiedPolyline::new(session_id, simplified);
    store.replace_simplified(&polyline)?;

    info!(
        "[TrajectoryService] session {}: {} -> {} points (eps={}m) in {:?}",
        session_id,
        points.len(),
        polyline.num_points(),
        epsilon,
        start.elapsed()
    );

    Ok(polyline)
}

/// Result of simplifying one session in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub result: Result<SimplifiedPolyline, TrajectoryError>,
}

/// Simplify many in-memory walks without touching a store.
///
/// Walks are processed in parallel when the `parallel` feature is enabled.
/// Output order matches input order.
pub fn simplify_many(
    tracks: &[(SessionId, Vec<GpsPoint>)],
    config: &SimplifyConfig,
) -> Vec<SimplifiedPolyline> {
    let start = Instant::now();

    #[cfg(feature = "parallel")]
    let polylines: Vec<SimplifiedPolyline> = {
        use rayon::prelude::*;
        tracks
            .par_iter()
            .map(|(session_id, points)| {
                SimplifiedPolyline::new(*session_id, simplify::simplify_with_config(points, config))
            })
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let polylines: Vec<SimplifiedPolyline> = tracks
        .iter()
        .map(|(session_id, points)| {
            SimplifiedPolyline::new(*session_id, simplify::simplify_with_config(points, config))
        })
        .collect();

    debug!(
        "[TrajectoryService] simplified {} tracks in {:?}",
        tracks.len(),
        start.elapsed()
    );

    polylines
}

/// Simplify and persist several sessions, one outcome per session id.
///
/// A failure in one session does not stop the others. Sessions are processed
/// in parallel when the `parallel` feature is enabled; duplicate ids in
/// `session_ids` would race on the same polyline and are processed once.
pub fn simplify_sessions<S: TrajectoryStore + ?Sized>(
    store: &S,
    session_ids: &[SessionId],
    config: &SimplifyConfig,
) -> Vec<SessionOutcome> {
    let start = Instant::now();

    let mut unique: Vec<SessionId> = Vec::with_capacity(session_ids.len());
    for id in session_ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    #[cfg(feature = "parallel")]
    let outcomes: Vec<SessionOutcome> = {
        use rayon::prelude::*;
        unique
            .par_iter()
            .map(|&session_id| SessionOutcome {
                session_id,
                result: simplify_session(store, session_id, config),
            })
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<SessionOutcome> = unique
        .iter()
        .map(|&session_id| SessionOutcome {
            session_id,
            result: simplify_session(store, session_id, config),
        })
        .collect();

    let success_count = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!(
        "[TrajectoryService] batch: {}/{} sessions simplified in {:?}",
        success_count,
        outcomes.len(),
        start.elapsed()
    );

    outcomes
}

/// Trajectory operations over a store, with a default configuration.
#[derive(Debug)]
pub struct TrajectoryService<S> {
    store: S,
    config: SimplifyConfig,
}

impl<S: TrajectoryStore> TrajectoryService<S> {
    /// Create a service with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, SimplifyConfig::default())
    }

    pub fn with_config(store: S, config: SimplifyConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    /// Record one sample logged by the walk client.
    pub fn record_sample(&self, sample: TrajectorySample) -> Result<SampleId, StoreError> {
        let ids = self.store.append_samples(std::slice::from_ref(&sample))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("store returned no id for inserted sample".to_string()))
    }

    /// Record a batch of samples, all or nothing.
    pub fn record_samples(&self, samples: &[TrajectorySample]) -> Result<Vec<SampleId>, StoreError> {
        let ids = self.store.append_samples(samples)?;
        debug!("[TrajectoryService] recorded {} samples", ids.len());
        Ok(ids)
    }

    /// Samples of one session ordered by `order`, or of every session when `None`.
    pub fn samples(&self, session_id: Option<SessionId>) -> Result<Vec<StoredSample>, StoreError> {
        match session_id {
            Some(id) => self.store.session_samples(id),
            None => self.store.all_samples(),
        }
    }

    pub fn update_sample(&self, id: SampleId, sample: &TrajectorySample) -> Result<bool, StoreError> {
        self.store.update_sample(id, sample)
    }

    pub fn delete_sample(&self, id: SampleId) -> Result<bool, StoreError> {
        self.store.delete_sample(id)
    }

    /// Delete all samples of a session. Its stored polyline is left as is.
    pub fn clear_session(&self, session_id: SessionId) -> Result<usize, StoreError> {
        let removed = self.store.clear_session(session_id)?;
        info!("[TrajectoryService] cleared {} samples from session {}", removed, session_id);
        Ok(removed)
    }

    /// Simplify and persist a session. `None` uses the configured tolerance.
    pub fn simplify_session(
        &self,
        session_id: SessionId,
        epsilon_meters: Option<f64>,
    ) -> Result<SimplifiedPolyline, TrajectoryError> {
        match epsilon_meters {
            Some(epsilon) => simplify_session(&self.store, session_id, &self.config.with_epsilon(epsilon)),
            None => simplify_session(&self.store, session_id, &self.config),
        }
    }

    /// Simplify and persist several sessions with the configured tolerance.
    pub fn simplify_sessions(&self, session_ids: &[SessionId]) -> Vec<SessionOutcome> {
        simplify_sessions(&self.store, session_ids, &self.config)
    }

    /// The stored polyline for a session; `None` when it was never simplified.
    pub fn simplified(&self, session_id: SessionId) -> Result<Option<SimplifiedPolyline>, StoreError> {
        self.store.simplified(session_id)
    }
}
