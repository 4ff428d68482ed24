//! Timestamp and coordinate parsing shared by the trip cleaner.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ward_flow_trip_models::GeoPoint;
use wkt::TryFromWkt as _;

/// Divvy export timestamp format, e.g. `06/27/2013 01:06:00 PM`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Parses a timestamp with the given `chrono` format string. Surrounding
/// whitespace is ignored.
#[must_use]
pub fn parse_timestamp(s: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), format).ok()
}

/// How trip coordinates are interpreted.
///
/// In a projected system the latitude columns carry northings and the
/// longitude columns eastings, so only finiteness is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// WGS84 degrees: range-checked, `(0, 0)` treated as a placeholder.
    #[default]
    Geographic,
    /// Planar units of a projected CRS.
    Projected,
}

/// Builds a point from optional latitude/longitude columns. Returns `None`
/// if either is missing or not a valid point in `space`.
#[must_use]
pub fn parse_lat_lng_f64(
    lat: Option<f64>,
    lng: Option<f64>,
    space: CoordinateSpace,
) -> Option<GeoPoint> {
    let latitude = lat?;
    let longitude = lng?;
    valid_point(latitude, longitude, space)
}

/// Parses a WKT `POINT (x y)` string, x being longitude or easting.
#[must_use]
pub fn parse_wkt_point(s: &str, space: CoordinateSpace) -> Option<GeoPoint> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let point = geo::Point::<f64>::try_from_wkt_str(s).ok()?;
    valid_point(point.y(), point.x(), space)
}

fn valid_point(latitude: f64, longitude: f64, space: CoordinateSpace) -> Option<GeoPoint> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if space == CoordinateSpace::Geographic {
        if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
            return None;
        }
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
    }
    Some(GeoPoint::new(latitude, longitude))
}
