//! Example of simplifying many walks at once.
//!
//! Run with: cargo run --example batch_simplify --features parallel

use std::time::Instant;
use walk_trajectory::{simplify_many, GpsPoint, SessionId, SimplifyConfig};

fn main() {
    println!("Batch Walk Simplification Example\n");

    let base_walk: Vec<GpsPoint> = (0..500)
        .map(|i| {
            let t = i as f64 * 0.02;
            GpsPoint::new(-23.55 + t.sin() * 0.002, -46.63 + i as f64 * 0.00002)
        })
        .collect();

    let sessions: Vec<(SessionId, Vec<GpsPoint>)> = (0..200)
        .map(|id| (id as SessionId, add_noise(&base_walk, 0.000002 * (id % 7) as f64)))
        .collect();

    println!("Created {} sessions of {} samples\n", sessions.len(), base_walk.len());

    let config = SimplifyConfig::default();

    let start = Instant::now();
    let polylines = simplify_many(&sessions, &config);
    let elapsed = start.elapsed();

    println!("Simplification completed in {:?}\n", elapsed);

    let total_in: usize = sessions.iter().map(|(_, points)| points.len()).sum();
    let total_out: usize = polylines.iter().map(|p| p.num_points()).sum();
    let largest = polylines.iter().map(|p| p.num_points()).max().unwrap_or(0);

    println!("Stats:");
    println!("  Input points: {}", total_in);
    println!("  Output points: {}", total_out);
    println!("  Reduction: {:.1}%", 100.0 * (1.0 - total_out as f64 / total_in as f64));
    println!("  Largest polyline: {} points", largest);
}

/// Add small noise to walk samples to simulate GPS jitter
fn add_noise(walk: &[GpsPoint], noise: f64) -> Vec<GpsPoint> {
    walk.iter()
        .enumerate()
        .map(|(i, p)| {
            GpsPoint::new(
                p.latitude + noise * (i as f64 % 2.0 - 0.5),
                p.longitude + noise * ((i + 1) as f64 % 2.0 - 0.5),
            )
        })
        .collect()
}
