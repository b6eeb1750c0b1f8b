//! Basic example of simplifying a recorded walk.
//!
//! Run with: cargo run --example basic_simplify

use walk_trajectory::geo_utils::perpendicular_distance;
use walk_trajectory::simplify::{simplify, simplify_with_config};
use walk_trajectory::{GpsPoint, MemoryStore, SimplifyConfig, TrajectorySample, TrajectoryService};

fn main() {
    // A short walk in Sao Paulo
    let walk = vec![
        GpsPoint::new(-23.5505, -46.6333), // Start
        GpsPoint::new(-23.5510, -46.6340),
        GpsPoint::new(-23.5515, -46.6345),
        GpsPoint::new(-23.5520, -46.6350), // End
    ];

    println!("Walk Simplification Examples\n");

    println!("1. Deviation of each interior sample from the start-end chord:");
    for (i, point) in walk.iter().enumerate().take(walk.len() - 1).skip(1) {
        let d = perpendicular_distance(point, &walk[0], &walk[walk.len() - 1]);
        println!("   sample {}: {:.2}m", i, d);
    }

    println!("\n2. Simplifying with different tolerances:");
    for epsilon in [10.0, 5.0, 0.5] {
        let simplified = simplify(&walk, epsilon);
        println!("   eps={:>4}m -> {} of {} points", epsilon, simplified.len(), walk.len());
    }

    // A lap around a block, sampled every ~11m
    let mut lap = Vec::new();
    for i in 0..10 {
        lap.push(GpsPoint::new(-23.5600, -46.6400 + i as f64 * 0.0001));
    }
    for i in 0..10 {
        lap.push(GpsPoint::new(-23.5600 + i as f64 * 0.0001, -46.6390));
    }
    for i in 0..10 {
        lap.push(GpsPoint::new(-23.5590, -46.6390 - i as f64 * 0.0001));
    }
    for i in 0..10 {
        lap.push(GpsPoint::new(-23.5590 - i as f64 * 0.0001, -46.6400));
    }

    let plain = simplify_with_config(&lap, &SimplifyConfig::default());
    let densified = simplify_with_config(&lap, &SimplifyConfig { densify: true, ..SimplifyConfig::default() });

    println!("\n3. Block lap ({} samples):", lap.len());
    println!("   plain:     {} points", plain.len());
    println!("   densified: {} points", densified.len());

    // Session orchestration against the in-memory store
    let service = TrajectoryService::new(MemoryStore::new());
    let samples: Vec<TrajectorySample> = lap
        .iter()
        .enumerate()
        .map(|(i, p)| TrajectorySample::new(39, i as i64, *p))
        .collect();

    if let Err(e) = service.record_samples(&samples) {
        println!("Failed to record samples: {}", e);
        return;
    }

    println!("\n4. Session 39:");
    match service.simplify_session(39, None) {
        Ok(polyline) => {
            println!("   Stored {} points, {:.0}m long", polyline.num_points(), polyline.length_meters());
            println!("   WKT: {}", polyline.to_wkt());
        }
        Err(e) => println!("   Failed: {}", e),
    }

    println!("\n5. Session without samples:");
    if let Err(e) = service.simplify_session(40, None) {
        println!("   {} (client error: {})", e, e.is_client_error());
    }
}
