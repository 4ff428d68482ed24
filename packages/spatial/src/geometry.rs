//! Boundary geometry parsing.
//!
//! Ward tables carry geometries either as WKT (`MULTIPOLYGON (((...)))`) or
//! as `GeoJSON` geometry objects. Both are normalized to [`MultiPolygon`].

use geo::{BoundingRect as _, MultiPolygon};
use geojson::GeoJson;
use rstar::AABB;
use wkt::TryFromWkt as _;

/// Parses a WKT or `GeoJSON` polygon/multipolygon.
///
/// # Errors
///
/// Returns a description of the problem if the text is empty, malformed,
/// or not a polygonal geometry.
pub fn parse_boundary(text: &str) -> Result<MultiPolygon<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty geometry".to_string());
    }

    let geometry = if text.starts_with('{') {
        parse_geojson_geometry(text)?
    } else {
        geo::Geometry::<f64>::try_from_wkt_str(text).map_err(|e| e.to_string())?
    };

    match geometry {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err("geometry is not a polygon or multipolygon".to_string()),
    }
}

fn parse_geojson_geometry(text: &str) -> Result<geo::Geometry<f64>, String> {
    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| e.to_string())?;
    let GeoJson::Geometry(geom) = geojson else {
        return Err("GeoJSON is not a bare geometry".to_string());
    };
    geom.try_into().map_err(|e: geojson::Error| e.to_string())
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
pub(crate) fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wkt_multipolygon() {
        let mp = parse_boundary("MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)))").unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn promotes_wkt_polygon() {
        let mp = parse_boundary("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn parses_geojson_polygon() {
        let mp = parse_boundary(
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#,
        )
        .unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn rejects_points_and_garbage() {
        assert!(parse_boundary("POINT (1 2)").is_err());
        assert!(parse_boundary("not wkt").is_err());
        assert!(parse_boundary("").is_err());
        assert!(parse_boundary(r#"{"type":"Feature"}"#).is_err());
    }

    #[test]
    fn envelope_covers_polygon() {
        let mp = parse_boundary("POLYGON ((2 3, 5 3, 5 7, 2 7, 2 3))").unwrap();
        let env = compute_envelope(&mp);
        assert_eq!(env.lower(), [2.0, 3.0]);
        assert_eq!(env.upper(), [5.0, 7.0]);
    }
}
