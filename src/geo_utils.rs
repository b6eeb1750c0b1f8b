//! # Geographic Utilities
//!
//! Distance metrics used by the trajectory simplifier and by the polyline views.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`perpendicular_distance`] | Meters from a point to the line through two points (flat-earth) |
//! | [`flat_earth_distance`] | Meters between two points (flat-earth) |
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//!
//! ## Example
//!
//! ```rust
//! use walk_trajectory::{GpsPoint, geo_utils};
//!
//! let start = GpsPoint::new(0.0, 0.0);
//! let end = GpsPoint::new(0.0, 0.002);
//! let off_line = GpsPoint::new(0.0001, 0.001);
//!
//! // 0.0001 degrees of latitude off the chord
//! let d = geo_utils::perpendicular_distance(&off_line, &start, &end);
//! assert!((d - 11.1).abs() < 1e-6);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Flat-earth projection
//!
//! Walks cover a few kilometers at most, so the simplifier treats the
//! neighbourhood of a walk as a plane: one degree of latitude is
//! [`METERS_PER_DEGREE`] meters and one degree of longitude is that scaled by
//! the cosine of the latitude of the point being measured. The error grows for
//! segments longer than ~100 km and near the poles. Antimeridian crossings are
//! not handled.
//!
//! ### Haversine Formula
//!
//! Track lengths reported for stored polylines use the great-circle distance,
//! computed with the `geo` crate.

use geo::{Distance, Haversine, Point};
use crate::{Bounds, GpsPoint};

/// Meters per degree of latitude used by the flat-earth projection.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

// =============================================================================
// Flat-earth Metrics
// =============================================================================

/// Convert a coordinate delta (degrees) to meters at the given latitude.
#[inline]
fn delta_to_meters(d_lat: f64, d_lng: f64, reference_lat: f64) -> f64 {
    let dx = d_lng * METERS_PER_DEGREE * reference_lat.to_radians().cos();
    let dy = d_lat * METERS_PER_DEGREE;
    (dx * dx + dy * dy).sqrt()
}

/// Approximate distance in meters between two points on a flat-earth projection.
///
/// The longitude scale is taken at `from`'s latitude.
#[inline]
pub fn flat_earth_distance(from: &GpsPoint, to: &GpsPoint) -> f64 {
    delta_to_meters(
        to.latitude - from.latitude,
        to.longitude - from.longitude,
        from.latitude,
    )
}

/// Distance in meters from `point` to the infinite line through `line_start`
/// and `line_end`.
///
/// The projection parameter is computed in raw longitude/latitude space and is
/// not clamped to the segment, so points beyond either end are measured against
/// the extended line. The coordinate delta between `point` and its projection
/// is converted to meters with the longitude scale at `point`'s latitude.
///
/// When `line_start == line_end` the line is degenerate and the result is the
/// flat-earth distance from `point` to that single position.
///
/// Inputs are not validated. The function never fails; non-finite inputs yield
/// non-finite output.
///
/// # Example
///
/// ```rust
/// use walk_trajectory::{GpsPoint, geo_utils};
///
/// let a = GpsPoint::new(0.0, 0.0);
/// let b = GpsPoint::new(0.0, 3.0);
///
/// // On the line, even past its end
/// assert_eq!(geo_utils::perpendicular_distance(&GpsPoint::new(0.0, 5.0), &a, &b), 0.0);
/// ```
pub fn perpendicular_distance(point: &GpsPoint, line_start: &GpsPoint, line_end: &GpsPoint) -> f64 {
    if line_start == line_end {
        return delta_to_meters(
            point.latitude - line_start.latitude,
            point.longitude - line_start.longitude,
            point.latitude,
        );
    }

    let dx = line_end.longitude - line_start.longitude;
    let dy = line_end.latitude - line_start.latitude;

    let t = ((point.longitude - line_start.longitude) * dx
        + (point.latitude - line_start.latitude) * dy)
        / (dx * dx + dy * dy);

    let projected_lng = line_start.longitude + t * dx;
    let projected_lat = line_start.latitude + t * dy;

    delta_to_meters(
        point.latitude - projected_lat,
        point.longitude - projected_lng,
        point.latitude,
    )
}

// =============================================================================
// Great-circle Functions
// =============================================================================

/// Great-circle distance in meters between two GPS points (spherical Earth).
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(
        Point::new(p1.longitude, p1.latitude),
        Point::new(p2.longitude, p2.latitude),
    )
}

/// Length of a walk in meters, summing haversine distances between
/// consecutive samples. Fewer than two samples give 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

// =============================================================================
// Bounding Box
// =============================================================================

/// Bounding box of a walk.
///
/// Empty input yields inverted infinite bounds; use [`Bounds::from_points`]
/// when the walk may be empty.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let empty = Bounds {
        min_lat: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        min_lng: f64::INFINITY,
        max_lng: f64::NEG_INFINITY,
    };

    points.iter().fold(empty, |b, p| Bounds {
        min_lat: b.min_lat.min(p.latitude),
        max_lat: b.max_lat.max(p.latitude),
        min_lng: b.min_lng.min(p.longitude),
        max_lng: b.max_lng.max(p.longitude),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_perpendicular_distance_on_line() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.0, 3.0);
        assert_eq!(perpendicular_distance(&GpsPoint::new(0.0, 1.0), &a, &b), 0.0);
        assert_eq!(perpendicular_distance(&GpsPoint::new(0.0, 2.0), &a, &b), 0.0);
    }

    #[test]
    fn test_perpendicular_distance_latitude_offset() {
        // 0.001 degrees north of an east-west line at the equator
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.0, 0.002);
        let p = GpsPoint::new(0.001, 0.005);
        assert!(approx_eq(perpendicular_distance(&p, &a, &b), 111.0, 1e-6));
    }

    #[test]
    fn test_perpendicular_distance_is_unclamped() {
        // Far beyond the end of the segment, but on its line
        let a = GpsPoint::new(10.0, 10.0);
        let b = GpsPoint::new(10.001, 10.001);
        let p = GpsPoint::new(10.01, 10.01);
        assert!(perpendicular_distance(&p, &a, &b) < 1e-6);
    }

    #[test]
    fn test_perpendicular_distance_degenerate_segment() {
        let a = GpsPoint::new(0.0, 0.0);
        let p = GpsPoint::new(0.001, 0.0);
        assert!(approx_eq(perpendicular_distance(&p, &a, &a), 111.0, 1e-6));
    }

    #[test]
    fn test_perpendicular_distance_degenerate_uses_point_latitude() {
        // Longitude scale shrinks with cos(latitude): cos(60°) = 0.5
        let a = GpsPoint::new(60.0, 0.0);
        let p = GpsPoint::new(60.0, 0.001);
        assert!(approx_eq(perpendicular_distance(&p, &a, &a), 55.5, 1e-6));
    }

    #[test]
    fn test_perpendicular_distance_symmetric_in_line_direction() {
        let a = GpsPoint::new(-23.5505, -46.6333);
        let b = GpsPoint::new(-23.5520, -46.6350);
        let p = GpsPoint::new(-23.5510, -46.6340);
        let forward = perpendicular_distance(&p, &a, &b);
        let backward = perpendicular_distance(&p, &b, &a);
        assert!(approx_eq(forward, backward, 1e-9));
        assert!(approx_eq(forward, 9.4436, 1e-3));
    }

    #[test]
    fn test_flat_earth_distance() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.003, 0.004);
        // 3-4-5 triangle at the equator
        assert!(approx_eq(flat_earth_distance(&a, &b), 555.0, 1e-6));
        assert_eq!(flat_earth_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(-23.5505, -46.6333);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_polyline_length_short_tracks() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GpsPoint::new(-23.5505, -46.6333)]), 0.0);
    }

    #[test]
    fn test_polyline_length_close_to_flat_earth() {
        // Over a few hundred meters the two metrics agree to within a percent
        let track = vec![
            GpsPoint::new(-23.5505, -46.6333),
            GpsPoint::new(-23.5510, -46.6340),
            GpsPoint::new(-23.5520, -46.6350),
        ];
        let haversine = polyline_length(&track);
        let flat: f64 = track.windows(2).map(|w| flat_earth_distance(&w[0], &w[1])).sum();
        assert!((haversine - flat).abs() / haversine < 0.01);
    }

    #[test]
    fn test_compute_bounds_of_walk() {
        let walk = vec![
            GpsPoint::new(-23.5505, -46.6333),
            GpsPoint::new(-23.5530, -46.6310),
            GpsPoint::new(-23.5490, -46.6350),
        ];
        let bounds = compute_bounds(&walk);
        assert_eq!(bounds.min_lat, -23.5530);
        assert_eq!(bounds.max_lat, -23.5490);
        assert_eq!(bounds.min_lng, -46.6350);
        assert_eq!(bounds.max_lng, -46.6310);

        let center = bounds.center();
        assert!(approx_eq(center.latitude, -23.551, 1e-9));
        assert!(approx_eq(center.longitude, -46.633, 1e-9));
    }
}
