//! # Douglas-Peucker Simplification
//!
//! Reduces a walk to the smallest subsequence of its samples such that every
//! discarded sample lies within `epsilon` meters of the chord that replaced it,
//! measured with [`perpendicular_distance`].
//!
//! The reduction keeps the first and last samples, finds the interior sample
//! farthest from the chord between them, and either keeps it and splits the
//! range there, or drops the whole interior when nothing exceeds `epsilon`.
//! Ranges are processed from an explicit work-list rather than by recursion, so
//! long traces cost heap instead of call stack. The kept set is the same as the
//! textbook recursive formulation.
//!
//! Ties on the maximum deviation go to the lowest index. With `epsilon = 0`
//! only points at exactly zero deviation are dropped; floating-point noise
//! usually keeps everything.
//!
//! Worst case is O(n²) when every split is maximally unbalanced.

use std::time::Instant;

use log::debug;

use crate::geo_utils::{flat_earth_distance, perpendicular_distance};
use crate::{GpsPoint, SimplifyConfig};

/// Simplify a walk, returning the kept points in their original order.
///
/// Inputs of 0, 1 or 2 points are returned unchanged. A negative or NaN
/// `epsilon` is treated as 0.0.
///
/// # Example
///
/// ```rust
/// use walk_trajectory::{GpsPoint, simplify::simplify};
///
/// let line = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 1.0),
///     GpsPoint::new(0.0, 2.0),
///     GpsPoint::new(0.0, 3.0),
/// ];
/// assert_eq!(simplify(&line, 1.0), vec![line[0], line[3]]);
/// ```
pub fn simplify(points: &[GpsPoint], epsilon: f64) -> Vec<GpsPoint> {
    simplify_indices(points, epsilon)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Same reduction as [`simplify`], returning indices into `points` (ascending).
pub fn simplify_indices(points: &[GpsPoint], epsilon: f64) -> Vec<usize> {
    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let start_time = Instant::now();
    let epsilon = sanitize_epsilon(epsilon);

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    // Inclusive index ranges still to be examined
    let mut pending = vec![(0usize, n - 1)];

    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }

        let (index, max_distance) = farthest_from_chord(points, start, end);

        if max_distance > epsilon {
            keep[index] = true;
            pending.push((index, end));
            pending.push((start, index));
        }
    }

    let kept: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| if k { Some(i) } else { None })
        .collect();

    debug!(
        "[Simplify] {} -> {} points (eps={}m) in {:?}",
        n,
        kept.len(),
        epsilon,
        start_time.elapsed()
    );

    kept
}

/// Simplify with a full [`SimplifyConfig`]: reduce with `epsilon_meters`, then
/// densify if enabled. `max_points` is not checked here.
pub fn simplify_with_config(points: &[GpsPoint], config: &SimplifyConfig) -> Vec<GpsPoint> {
    let mut kept = simplify_indices(points, config.epsilon_meters);

    if config.densify {
        kept = densify_indices(points, kept, config);
    }

    kept.into_iter().map(|i| points[i]).collect()
}

/// Largest perpendicular distance of any interior point from the first-last chord.
///
/// Returns 0.0 for inputs with no interior points.
pub fn max_deviation(points: &[GpsPoint]) -> f64 {
    if points.len() <= 2 {
        return 0.0;
    }
    farthest_from_chord(points, 0, points.len() - 1).1
}

/// Re-insert evenly spaced interior samples when a reduction kept too few.
///
/// Only applies when the input has at least
/// [`SimplifyConfig::min_points_for`] samples and `kept` has fewer. Candidates
/// are taken at uniform intervals over the interior samples; a candidate
/// within `densify_spacing_meters` of an already kept (or just added) sample is
/// skipped, so the result may still fall short of the target.
///
/// `kept` must be ascending indices into `points`. The result is ascending and
/// keeps every index of `kept`.
pub fn densify_indices(points: &[GpsPoint], kept: Vec<usize>, config: &SimplifyConfig) -> Vec<usize> {
    let n = points.len();
    let target = config.min_points_for(n);

    if kept.len() >= target || n < target {
        return kept;
    }

    let interior = n.saturating_sub(2);
    if interior == 0 {
        return kept;
    }

    let to_add = target - kept.len();
    let interval = interior as f64 / (to_add + 1) as f64;
    let spacing = config.densify_spacing_meters;

    let mut added: Vec<usize> = Vec::with_capacity(to_add);
    for i in 1..=to_add {
        let offset = ((i as f64 * interval) as usize).min(interior - 1);
        let candidate = offset + 1;
        let point = &points[candidate];

        let crowded = kept
            .iter()
            .chain(added.iter())
            .any(|&j| flat_earth_distance(point, &points[j]) < spacing);

        if !crowded {
            added.push(candidate);
        }
    }

    debug!(
        "[Simplify] densified {} -> {} points (target {})",
        kept.len(),
        kept.len() + added.len(),
        target
    );

    let mut merged = kept;
    merged.extend(added);
    merged.sort_unstable();
    merged.dedup();
    merged
}

/// Index and distance of the interior point of `points[start..=end]` farthest
/// from the chord `points[start]`-`points[end]`. Strict `>` keeps the first
/// maximum.
fn farthest_from_chord(points: &[GpsPoint], start: usize, end: usize) -> (usize, f64) {
    let first = &points[start];
    let last = &points[end];

    let mut max_distance = 0.0;
    let mut max_index = start;

    for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
        let distance = perpendicular_distance(point, first, last);
        if distance > max_distance {
            max_distance = distance;
            max_index = i;
        }
    }

    (max_index, max_distance)
}

#[inline]
fn sanitize_epsilon(epsilon: f64) -> f64 {
    if epsilon >= 0.0 {
        epsilon
    } else {
        0.0
    }
}
