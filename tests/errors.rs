//! Error surface: messages, client/infrastructure split and status codes.

use walk_trajectory::encoding::{parse_wkt_linestring, WktError};
use walk_trajectory::{StoreError, TrajectoryError};

#[test]
fn test_client_errors_map_to_400() {
    let errors = [
        TrajectoryError::NoTrajectoryData { session_id: 39 },
        TrajectoryError::DegenerateResult { session_id: 39, point_count: 1 },
        TrajectoryError::InvalidTolerance(f64::NAN),
        TrajectoryError::TooManyPoints { session_id: 39, point_count: 50_001, limit: 50_000 },
    ];

    for err in &errors {
        assert!(err.is_client_error(), "{}", err);
        assert_eq!(err.status_code(), 400);
    }
}

#[test]
fn test_storage_errors_map_to_500() {
    let errors = [
        StoreError::Backend("connection refused".to_string()),
        StoreError::Poisoned,
        StoreError::DuplicateOrder { session_id: 39, order: 4 },
    ];

    for store_err in errors {
        let message = store_err.to_string();
        let err = TrajectoryError::from(store_err);
        assert!(!err.is_client_error());
        assert_eq!(err.status_code(), 500);
        // Propagated unchanged
        assert_eq!(err.to_string(), message);
    }
}

#[test]
fn test_error_messages_name_the_session() {
    let err = TrajectoryError::TooManyPoints { session_id: 12, point_count: 900, limit: 500 };
    assert_eq!(err.to_string(), "Session 12 has 900 points, limit is 500");

    let err = StoreError::DuplicateOrder { session_id: 12, order: 3 };
    assert_eq!(err.to_string(), "Session 12 already has a sample with order 3");
}

#[test]
fn test_wkt_errors() {
    assert_eq!(
        parse_wkt_linestring("MULTIPOINT(1 2, 3 4)"),
        Err(WktError::NotALineString("MULTIPOINT(1 2, 3 4)".to_string()))
    );
    assert_eq!(
        parse_wkt_linestring("LINESTRING(a b, 3 4)"),
        Err(WktError::InvalidCoordinate("a b".to_string()))
    );
}
