//! Property checks for Douglas-Peucker simplification over random walks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use walk_trajectory::geo_utils::perpendicular_distance;
use walk_trajectory::simplify::{simplify, simplify_indices};
use walk_trajectory::GpsPoint;

const SEEDS: u64 = 64;

/// Jittery walk starting in Sao Paulo, roughly 5-20m between samples.
fn random_walk(rng: &mut StdRng) -> Vec<GpsPoint> {
    let len = rng.random_range(0..200);
    let mut lat = -23.5505;
    let mut lng = -46.6333;
    let mut heading: f64 = rng.random_range(0.0..std::f64::consts::TAU);

    (0..len)
        .map(|_| {
            heading += rng.random_range(-0.6..0.6);
            let step = rng.random_range(0.00005..0.0002);
            lat += heading.sin() * step;
            lng += heading.cos() * step;
            GpsPoint::new(lat, lng)
        })
        .collect()
}

/// Textbook recursive formulation, first maximum wins.
fn reference_indices(points: &[GpsPoint], epsilon: f64) -> Vec<usize> {
    fn recurse(points: &[GpsPoint], start: usize, end: usize, epsilon: f64, out: &mut Vec<usize>) {
        let mut max_distance = 0.0;
        let mut max_index = start;
        for i in start + 1..end {
            let d = perpendicular_distance(&points[i], &points[start], &points[end]);
            if d > max_distance {
                max_distance = d;
                max_index = i;
            }
        }
        if max_distance > epsilon {
            recurse(points, start, max_index, epsilon, out);
            out.push(max_index);
            recurse(points, max_index, end, epsilon, out);
        }
    }

    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }
    let mut out = vec![0];
    recurse(points, 0, n - 1, epsilon, &mut out);
    out.push(n - 1);
    out
}

#[test]
fn test_matches_recursive_reference() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let walk = random_walk(&mut rng);
        for epsilon in [0.0, 1.0, 10.0, 50.0] {
            assert_eq!(
                simplify_indices(&walk, epsilon),
                reference_indices(&walk, epsilon),
                "seed {} eps {}",
                seed,
                epsilon
            );
        }
    }
}

#[test]
fn test_endpoints_kept_and_order_preserved() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let walk = random_walk(&mut rng);
        let kept = simplify_indices(&walk, 10.0);

        if walk.len() >= 2 {
            assert_eq!(kept.first(), Some(&0));
            assert_eq!(kept.last(), Some(&(walk.len() - 1)));
        } else {
            assert_eq!(kept.len(), walk.len());
        }
        assert!(kept.windows(2).all(|w| w[0] < w[1]), "seed {}", seed);

        let points = simplify(&walk, 10.0);
        let expected: Vec<GpsPoint> = kept.iter().map(|&i| walk[i]).collect();
        assert_eq!(points, expected);
    }
}

#[test]
fn test_discarded_points_within_tolerance() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let walk = random_walk(&mut rng);
        let epsilon = rng.random_range(1.0..30.0);
        let kept = simplify_indices(&walk, epsilon);

        for pair in kept.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            for point in &walk[a + 1..b] {
                let d = perpendicular_distance(point, &walk[a], &walk[b]);
                assert!(d <= epsilon + 1e-6, "seed {}: {}m > {}m", seed, d, epsilon);
            }
        }
    }
}

#[test]
fn test_larger_tolerance_keeps_subset() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let walk = random_walk(&mut rng);

        let tight = simplify_indices(&walk, 2.0);
        let loose = simplify_indices(&walk, 20.0);

        assert!(loose.len() <= tight.len());
        assert!(loose.iter().all(|i| tight.contains(i)), "seed {}", seed);
    }
}

#[test]
fn test_straight_street_collapses() {
    let street: Vec<GpsPoint> = (0..100)
        .map(|i| GpsPoint::new(-23.5505, -46.6333 + i as f64 * 0.0001))
        .collect();
    assert_eq!(simplify_indices(&street, 0.0), vec![0, 99]);
}

#[test]
fn test_short_walk_example() {
    let walk = vec![
        GpsPoint::new(-23.5505, -46.6333),
        GpsPoint::new(-23.5510, -46.6340),
        GpsPoint::new(-23.5515, -46.6345),
        GpsPoint::new(-23.5520, -46.6350),
    ];

    // Interior samples deviate ~9.4m and ~4.7m from the chord
    assert_eq!(simplify(&walk, 10.0), vec![walk[0], walk[3]]);
    assert_eq!(simplify(&walk, 0.5), vec![walk[0], walk[1], walk[3]]);
}
