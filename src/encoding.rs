//! Wire encodings for simplified polylines.
//!
//! Stored polylines are exchanged as WKT `LINESTRING`s in SRID 4326 order
//! (longitude first) and, with the `json` feature, as GeoJSON geometries.

use crate::{GpsPoint, SimplifiedPolyline};

/// Errors from decoding a WKT linestring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WktError {
    #[error("Expected LINESTRING, got: {0}")]
    NotALineString(String),

    #[error("Invalid coordinate pair: {0}")]
    InvalidCoordinate(String),

    #[error("Linestring needs at least 2 points, got {0}")]
    TooFewPoints(usize),
}

/// Encode points as `LINESTRING(lng lat, lng lat, ...)`.
pub fn to_wkt(points: &[GpsPoint]) -> String {
    let coords: Vec<String> = points
        .iter()
        .map(|p| format!("{} {}", p.longitude, p.latitude))
        .collect();
    format!("LINESTRING({})", coords.join(", "))
}

/// Decode a WKT `LINESTRING` into points.
///
/// Accepts any case for the keyword and arbitrary whitespace. Z/M ordinates
/// are not supported.
pub fn parse_wkt_linestring(wkt: &str) -> Result<Vec<GpsPoint>, WktError> {
    let trimmed = wkt.trim();
    let keyword = "LINESTRING";

    let body = trimmed
        .get(..keyword.len())
        .filter(|head| head.eq_ignore_ascii_case(keyword))
        .map(|_| trimmed[keyword.len()..].trim())
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| WktError::NotALineString(trimmed.to_string()))?;

    let points = body
        .split(',')
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            let coords = (parts.next(), parts.next(), parts.next());
            match coords {
                (Some(lng), Some(lat), None) => {
                    let lng: f64 = lng.parse().map_err(|_| WktError::InvalidCoordinate(pair.trim().to_string()))?;
                    let lat: f64 = lat.parse().map_err(|_| WktError::InvalidCoordinate(pair.trim().to_string()))?;
                    Ok(GpsPoint::new(lat, lng))
                }
                _ => Err(WktError::InvalidCoordinate(pair.trim().to_string())),
            }
        })
        .collect::<Result<Vec<GpsPoint>, WktError>>()?;

    if points.len() < 2 {
        return Err(WktError::TooFewPoints(points.len()));
    }

    Ok(points)
}

impl SimplifiedPolyline {
    /// WKT `LINESTRING` of the polyline, longitude first.
    pub fn to_wkt(&self) -> String {
        to_wkt(&self.points)
    }

    /// GeoJSON `LineString` geometry of the polyline.
    #[cfg(feature = "json")]
    pub fn to_geojson(&self) -> serde_json::Value {
        to_geojson(&self.points)
    }
}

/// GeoJSON `LineString` geometry with `[lng, lat]` positions.
#[cfg(feature = "json")]
pub fn to_geojson(points: &[GpsPoint]) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> = points.iter().map(|p| [p.longitude, p.latitude]).collect();
    serde_json::json!({
        "type": "LineString",
        "coordinates": coordinates,
    })
}
