//! # Walk Trajectory
//!
//! GPS trajectory simplification for recorded pet-walking sessions.
//!
//! A walk is logged by the mobile app as an ordered series of location samples.
//! This library reduces that series to a minimal polyline that keeps the shape of
//! the walk within a tolerance given in meters:
//! - Perpendicular distance on a flat-earth (equirectangular) projection
//! - Douglas-Peucker reduction over an explicit work-list
//! - Session orchestration against a pluggable trajectory store
//!
//! ## Features
//!
//! - **`parallel`** - Batch simplification across sessions with rayon
//! - **`json`** - Serde derives and GeoJSON output
//! - **`http`** - Async client for the trajectory REST endpoints
//! - **`ffi`** - FFI bindings for the mobile walk logger (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use walk_trajectory::{GpsPoint, simplify};
//!
//! let walk = vec![
//!     GpsPoint::new(-23.5505, -46.6333),
//!     GpsPoint::new(-23.5510, -46.6340),
//!     GpsPoint::new(-23.5515, -46.6345),
//!     GpsPoint::new(-23.5520, -46.6350),
//! ];
//!
//! // Nothing deviates more than 10m from the start-end chord
//! let simplified = simplify::simplify(&walk, 10.0);
//! assert_eq!(simplified, vec![walk[0], walk[3]]);
//! ```
//!
//! Session-level simplification goes through a [`TrajectoryStore`]:
//!
//! ```rust
//! use walk_trajectory::{GpsPoint, MemoryStore, TrajectorySample, TrajectoryService};
//!
//! let service = TrajectoryService::new(MemoryStore::new());
//! let samples: Vec<TrajectorySample> = (0..20)
//!     .map(|i| TrajectorySample::new(7, i, GpsPoint::new(-23.55 - i as f64 * 0.0001, -46.63)))
//!     .collect();
//! service.record_samples(&samples).unwrap();
//!
//! let polyline = service.simplify_session(7, None).unwrap();
//! assert_eq!(polyline.num_points(), 2);
//! assert_eq!(service.simplified(7).unwrap(), Some(polyline));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{StoreError, TrajectoryError};

pub mod geo_utils;

pub mod simplify;

pub mod store;
pub use store::{MemoryStore, TrajectoryStore};

pub mod session;
pub use session::{simplify_many, simplify_session, simplify_sessions, SessionOutcome, TrajectoryService};

pub mod encoding;

// HTTP module for the trajectory endpoints
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ClientError, TrajectoryClient};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("WalkTrajectoryRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a recorded walking session.
pub type SessionId = i64;

/// Identifier the store assigns to a persisted trajectory sample.
pub type SampleId = u64;

/// A GPS coordinate with latitude and longitude, in degrees.
///
/// Equality is structural: two points are equal when both coordinates are.
///
/// # Example
/// ```
/// use walk_trajectory::GpsPoint;
/// let point = GpsPoint::new(-23.5505, -46.6333); // Sao Paulo
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// One location sample logged during a walk.
///
/// `order` is the strictly increasing sequence index within the session.
/// Samples are immutable once recorded and are cleared together with
/// their session's trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TrajectorySample {
    pub session_id: SessionId,
    pub order: i64,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub point: GpsPoint,
}

impl TrajectorySample {
    pub fn new(session_id: SessionId, order: i64, point: GpsPoint) -> Self {
        Self { session_id, order, point }
    }
}

/// A sample as held by a [`TrajectoryStore`], with its assigned id.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StoredSample {
    pub id: SampleId,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub sample: TrajectorySample,
}

/// The reduced path of a walking session.
///
/// Always an order-preserving subsequence of the session's samples that
/// includes the first and last sample, with at least two points.
/// Recomputed and overwritten each time the session is simplified.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SimplifiedPolyline {
    pub session_id: SessionId,
    pub points: Vec<GpsPoint>,
}

impl SimplifiedPolyline {
    pub fn new(session_id: SessionId, points: Vec<GpsPoint>) -> Self {
        Self { session_id, points }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Length along the polyline in meters (haversine).
    pub fn length_meters(&self) -> f64 {
        geo_utils::polyline_length(&self.points)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    pub fn start_point(&self) -> Option<GpsPoint> {
        self.points.first().copied()
    }

    pub fn end_point(&self) -> Option<GpsPoint> {
        self.points.last().copied()
    }
}

/// Configuration for session simplification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SimplifyConfig {
    /// Maximum perpendicular deviation (meters) a discarded point may have.
    /// Default: 10.0 meters
    pub epsilon_meters: f64,

    /// Reject sessions with more samples than this. Bounds the O(n²) worst case.
    /// Default: None (no limit)
    pub max_points: Option<u32>,

    /// Re-insert evenly spaced samples when the reduction leaves too few
    /// points, so loops around a block still render as loops.
    /// Default: false
    pub densify: bool,

    /// Lower bound on the densification target.
    /// Default: 5
    pub min_points_floor: u32,

    /// Densification target as a fraction of the input length.
    /// Default: 0.15
    pub min_points_fraction: f64,

    /// Upper bound on the fractional part of the densification target.
    /// Default: 30
    pub min_points_cap: u32,

    /// Candidates closer than this to a kept point are not re-inserted.
    /// Default: 5.0 meters
    pub densify_spacing_meters: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            epsilon_meters: 10.0,
            max_points: None,
            densify: false,
            min_points_floor: 5,
            min_points_fraction: 0.15,
            min_points_cap: 30,
            densify_spacing_meters: 5.0,
        }
    }
}

impl SimplifyConfig {
    /// Same configuration with a different tolerance.
    pub fn with_epsilon(&self, epsilon_meters: f64) -> Self {
        Self { epsilon_meters, ..self.clone() }
    }

    /// Number of points densification aims for, given the input length.
    pub fn min_points_for(&self, input_len: usize) -> usize {
        let fractional = (input_len as f64 * self.min_points_fraction) as usize;
        fractional
            .min(self.min_points_cap as usize)
            .max(self.min_points_floor as usize)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::info;

    /// Callback interface for receiving progress updates during remote batches.
    /// Implement this in Kotlin/Swift to receive real-time updates.
    #[cfg(feature = "http")]
    #[uniffi::export(callback_interface)]
    pub trait SimplifyProgressCallback: Send + Sync {
        fn on_progress(&self, completed: u32, total: u32);
    }

    /// Simplify a walk with the given tolerance in meters.
    #[uniffi::export]
    pub fn ffi_simplify(points: Vec<GpsPoint>, epsilon_meters: f64) -> Vec<GpsPoint> {
        init_logging();
        info!("[WalkTrajectoryRust] ffi_simplify called with {} points, eps={}m", points.len(), epsilon_meters);
        simplify::simplify(&points, epsilon_meters)
    }

    /// Simplify a walk using a full configuration (densification, limits).
    /// Returns an empty list when the input exceeds `max_points`.
    #[uniffi::export]
    pub fn ffi_simplify_with_config(points: Vec<GpsPoint>, config: SimplifyConfig) -> Vec<GpsPoint> {
        init_logging();
        if let Some(limit) = config.max_points {
            if points.len() > limit as usize {
                info!("[WalkTrajectoryRust] rejecting {} points (limit {})", points.len(), limit);
                return Vec::new();
            }
        }
        simplify::simplify_with_config(&points, &config)
    }

    /// Simplify a flat coordinate buffer [lat1, lng1, lat2, lng2, ...].
    /// Returns the kept points in the same flat layout.
    #[uniffi::export]
    pub fn ffi_simplify_flat(coords: Vec<f64>, epsilon_meters: f64) -> Vec<f64> {
        init_logging();
        let points: Vec<GpsPoint> = coords
            .chunks_exact(2)
            .map(|chunk| GpsPoint::new(chunk[0], chunk[1]))
            .collect();

        simplify::simplify(&points, epsilon_meters)
            .into_iter()
            .flat_map(|p| [p.latitude, p.longitude])
            .collect()
    }

    /// Distance in meters from a point to the line through two others.
    #[uniffi::export]
    pub fn ffi_perpendicular_distance(point: GpsPoint, line_start: GpsPoint, line_end: GpsPoint) -> f64 {
        geo_utils::perpendicular_distance(&point, &line_start, &line_end)
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_config() -> SimplifyConfig {
        init_logging();
        SimplifyConfig::default()
    }

    /// Outcome of a remote session simplification.
    #[cfg(feature = "http")]
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiRemoteSimplifyResult {
        pub session_id: SessionId,
        /// Kept points as flat array [lat1, lng1, lat2, lng2, ...]
        pub latlngs: Vec<f64>,
        pub success: bool,
        pub error: Option<String>,
    }

    /// Ask the backend to simplify several sessions concurrently.
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn ffi_simplify_remote_sessions(
        base_url: String,
        token: Option<String>,
        session_ids: Vec<SessionId>,
        epsilon_meters: Option<f64>,
    ) -> Vec<FfiRemoteSimplifyResult> {
        init_logging();
        info!("[WalkTrajectoryRust] remote simplify for {} sessions", session_ids.len());

        let results = crate::http::simplify_sessions_sync(base_url, token, session_ids, epsilon_meters, None);
        results.into_iter().map(to_ffi_result).collect()
    }

    /// Same as ffi_simplify_remote_sessions, reporting progress after each session.
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn ffi_simplify_remote_sessions_with_progress(
        base_url: String,
        token: Option<String>,
        session_ids: Vec<SessionId>,
        epsilon_meters: Option<f64>,
        callback: Box<dyn SimplifyProgressCallback>,
    ) -> Vec<FfiRemoteSimplifyResult> {
        use std::sync::Arc;

        init_logging();
        info!("[WalkTrajectoryRust] remote simplify (with progress) for {} sessions", session_ids.len());

        let callback = Arc::new(callback);
        let progress: crate::http::ProgressCallback = Arc::new(move |completed, total| {
            callback.on_progress(completed, total);
        });

        let results = crate::http::simplify_sessions_sync(
            base_url,
            token,
            session_ids,
            epsilon_meters,
            Some(progress),
        );
        results.into_iter().map(to_ffi_result).collect()
    }

    #[cfg(feature = "http")]
    fn to_ffi_result(outcome: crate::http::RemoteOutcome) -> FfiRemoteSimplifyResult {
        match outcome.result {
            Ok(polyline) => FfiRemoteSimplifyResult {
                session_id: outcome.session_id,
                latlngs: polyline
                    .points
                    .iter()
                    .flat_map(|p| [p.latitude, p.longitude])
                    .collect(),
                success: true,
                error: None,
            },
            Err(e) => FfiRemoteSimplifyResult {
                session_id: outcome.session_id,
                latlngs: vec![],
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}


// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_walk() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(-23.5505, -46.6333),
            GpsPoint::new(-23.5510, -46.6340),
            GpsPoint::new(-23.5515, -46.6345),
            GpsPoint::new(-23.5520, -46.6350),
        ]
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(-23.5505, -46.6333).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_gps_point_structural_equality() {
        assert_eq!(GpsPoint::new(1.0, 2.0), GpsPoint::new(1.0, 2.0));
        assert_ne!(GpsPoint::new(1.0, 2.0), GpsPoint::new(2.0, 1.0));
    }

    #[test]
    fn test_bounds_from_points() {
        assert!(Bounds::from_points(&[]).is_none());

        let bounds = Bounds::from_points(&sample_walk()).unwrap();
        assert_eq!(bounds.min_lat, -23.5520);
        assert_eq!(bounds.max_lat, -23.5505);
        assert_eq!(bounds.min_lng, -46.6350);
        assert_eq!(bounds.max_lng, -46.6333);
    }

    #[test]
    fn test_polyline_accessors() {
        let walk = sample_walk();
        let polyline = SimplifiedPolyline::new(3, vec![walk[0], walk[3]]);

        assert_eq!(polyline.num_points(), 2);
        assert_eq!(polyline.start_point(), Some(walk[0]));
        assert_eq!(polyline.end_point(), Some(walk[3]));
        // ~230m from first to last sample
        let length = polyline.length_meters();
        assert!(length > 200.0 && length < 260.0, "length was {}", length);
    }

    #[test]
    fn test_default_config() {
        let config = SimplifyConfig::default();
        assert_eq!(config.epsilon_meters, 10.0);
        assert_eq!(config.max_points, None);
        assert!(!config.densify);
    }

    #[test]
    fn test_min_points_for() {
        let config = SimplifyConfig::default();
        // Floor dominates for short walks
        assert_eq!(config.min_points_for(10), 5);
        // 15% of 100
        assert_eq!(config.min_points_for(100), 15);
        // Capped at 30
        assert_eq!(config.min_points_for(1000), 30);
    }

    #[test]
    fn test_with_epsilon_keeps_other_fields() {
        let config = SimplifyConfig { densify: true, ..SimplifyConfig::default() };
        let tighter = config.with_epsilon(2.5);
        assert_eq!(tighter.epsilon_meters, 2.5);
        assert!(tighter.densify);
    }
}
