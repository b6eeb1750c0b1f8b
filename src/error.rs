//! Error types for trajectory storage and session simplification.
//!
//! The distance metric and the reducer never fail; everything here comes from
//! the session layer or the store behind it.

use crate::SessionId;

/// Failure reported by a [`TrajectoryStore`](crate::TrajectoryStore).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Session {session_id} already has a sample with order {order}")]
    DuplicateOrder { session_id: SessionId, order: i64 },
}

/// Errors raised while simplifying a session's trajectory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajectoryError {
    #[error("No trajectory data for session {session_id}")]
    NoTrajectoryData { session_id: SessionId },

    #[error("Session {session_id}: polyline needs at least 2 points, got {point_count}")]
    DegenerateResult { session_id: SessionId, point_count: usize },

    #[error("Invalid tolerance {0}: must be a finite, non-negative number of meters")]
    InvalidTolerance(f64),

    #[error("Session {session_id} has {point_count} points, limit is {limit}")]
    TooManyPoints {
        session_id: SessionId,
        point_count: usize,
        limit: usize,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl TrajectoryError {
    /// Whether the request itself was at fault (as opposed to infrastructure).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TrajectoryError::Storage(_))
    }

    /// HTTP status an endpoint should answer with for this error.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}
