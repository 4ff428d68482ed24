#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for ward attribution.
//!
//! Builds an R-tree over ward bounding boxes and answers point-in-polygon
//! lookups by testing only the wards whose envelope contains the query
//! point. The index is immutable once built and is shared by reference
//! across the spatial assigner's worker threads.

pub mod crs;
pub mod geometry;
pub mod loader;

use std::collections::BTreeSet;

use geo::{Intersects as _, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use ward_flow_trip_models::{GeoPoint, WardId};

pub use crate::crs::Crs;
pub use crate::loader::{WardColumns, read_wards, read_wards_from_path};

/// Errors raised while loading wards or preparing spatial queries. All of
/// them abort the run.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The query points and the ward boundaries are declared in different
    /// reference systems.
    #[error("CRS mismatch: wards are in {index}, points are in {points}")]
    CrsMismatch {
        /// CRS of the ward index.
        index: Crs,
        /// CRS of the query points.
        points: Crs,
    },

    /// No wards were supplied.
    #[error("ward set is empty")]
    EmptyWardSet,

    /// A ward boundary could not be parsed.
    #[error("invalid geometry for ward {ward}: {message}")]
    InvalidGeometry {
        /// Ward identifier text as it appeared in the input.
        ward: String,
        /// Description of the problem.
        message: String,
    },

    /// A ward identifier is not a non-negative integer.
    #[error("invalid ward id {value:?}")]
    InvalidWardId {
        /// Offending text.
        value: String,
    },

    /// A configured column is absent from the ward table.
    #[error("ward table has no column {column:?}")]
    MissingColumn {
        /// Missing column name.
        column: String,
    },

    /// A CRS identifier could not be parsed.
    #[error("invalid CRS identifier {value:?}")]
    InvalidCrs {
        /// Offending text.
        value: String,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error opening the input.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A municipal ward polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Ward {
    /// Ward number.
    pub id: WardId,
    /// Boundary in the index CRS, x = longitude, y = latitude.
    pub boundary: MultiPolygon<f64>,
}

/// A ward polygon stored in the R-tree.
struct WardEntry {
    id: WardId,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for WardEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over ward boundaries.
pub struct WardIndex {
    tree: RTree<WardEntry>,
    crs: Crs,
    ward_ids: Vec<WardId>,
}

impl WardIndex {
    /// Builds the R-tree from ward polygons declared in `crs`.
    ///
    /// Several rows may share a ward id (e.g. a ward split across
    /// disjoint pieces); they all resolve to the same id.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::EmptyWardSet`] if `wards` is empty.
    pub fn build(wards: Vec<Ward>, crs: Crs) -> Result<Self, SpatialError> {
        if wards.is_empty() {
            return Err(SpatialError::EmptyWardSet);
        }

        let ward_ids: Vec<WardId> = wards
            .iter()
            .map(|w| w.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let entries: Vec<WardEntry> = wards
            .into_iter()
            .map(|ward| WardEntry {
                id: ward.id,
                envelope: geometry::compute_envelope(&ward.boundary),
                polygon: ward.boundary,
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::info!(
            "Loaded {} ward polygons ({} distinct wards) into spatial index ({crs})",
            tree.size(),
            ward_ids.len()
        );

        Ok(Self {
            tree,
            crs,
            ward_ids,
        })
    }

    /// Returns the CRS the ward boundaries are declared in.
    #[must_use]
    pub const fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Returns the distinct ward ids in ascending order.
    #[must_use]
    pub fn ward_ids(&self) -> &[WardId] {
        &self.ward_ids
    }

    /// Verifies that points declared in `points` can be queried against
    /// this index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CrsMismatch`] if the identifiers differ.
    pub fn ensure_crs(&self, points: &Crs) -> Result<(), SpatialError> {
        if &self.crs == points {
            Ok(())
        } else {
            Err(SpatialError::CrsMismatch {
                index: self.crs.clone(),
                points: points.clone(),
            })
        }
    }

    /// Look up the ward containing a point.
    ///
    /// Boundaries are inclusive. A point on an edge shared by several wards
    /// resolves to the lowest ward id; a point outside every ward returns
    /// `None`.
    #[must_use]
    pub fn locate(&self, point: GeoPoint) -> Option<WardId> {
        let query = geo::Point::new(point.longitude, point.latitude);
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&query))
            .map(|entry| entry.id)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_boundary;

    fn square(id: u32, min_lng: f64, min_lat: f64) -> Ward {
        let (x0, y0, x1, y1) = (min_lng, min_lat, min_lng + 1.0, min_lat + 1.0);
        Ward {
            id: WardId(id),
            boundary: parse_boundary(&format!(
                "POLYGON (({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))"
            ))
            .unwrap(),
        }
    }

    fn two_squares() -> WardIndex {
        WardIndex::build(vec![square(1, 0.0, 0.0), square(2, 5.0, 5.0)], Crs::wgs84()).unwrap()
    }

    #[test]
    fn centroids_resolve_to_their_ward() {
        let index = two_squares();
        assert_eq!(index.locate(GeoPoint::new(0.5, 0.5)), Some(WardId(1)));
        assert_eq!(index.locate(GeoPoint::new(5.5, 5.5)), Some(WardId(2)));
    }

    #[test]
    fn far_point_is_unassigned() {
        let index = two_squares();
        assert_eq!(index.locate(GeoPoint::new(50.0, -120.0)), None);
        // Inside the gap between the two envelopes.
        assert_eq!(index.locate(GeoPoint::new(3.0, 3.0)), None);
    }

    #[test]
    fn shared_edge_resolves_to_lowest_id() {
        let index =
            WardIndex::build(vec![square(7, 0.0, 0.0), square(3, 1.0, 0.0)], Crs::wgs84())
                .unwrap();
        // latitude 0.5, longitude 1.0 lies on the shared edge.
        assert_eq!(index.locate(GeoPoint::new(0.5, 1.0)), Some(WardId(3)));
        assert_eq!(index.locate(GeoPoint::new(0.5, 0.5)), Some(WardId(7)));
    }

    #[test]
    fn locate_is_repeatable() {
        let index = two_squares();
        let p = GeoPoint::new(0.25, 0.75);
        let first = index.locate(p);
        for _ in 0..10 {
            assert_eq!(index.locate(p), first);
        }
    }

    #[test]
    fn bounding_box_hit_outside_polygon_is_unassigned() {
        let triangle = Ward {
            id: WardId(9),
            boundary: parse_boundary("POLYGON ((0 0, 2 0, 0 2, 0 0))").unwrap(),
        };
        let index = WardIndex::build(vec![triangle], Crs::wgs84()).unwrap();
        assert_eq!(index.locate(GeoPoint::new(0.5, 0.5)), Some(WardId(9)));
        assert_eq!(index.locate(GeoPoint::new(1.8, 1.8)), None);
    }

    #[test]
    fn empty_ward_set_is_rejected() {
        assert!(matches!(
            WardIndex::build(Vec::new(), Crs::wgs84()),
            Err(SpatialError::EmptyWardSet)
        ));
    }

    #[test]
    fn crs_mismatch_is_rejected() {
        let index = two_squares();
        assert!(index.ensure_crs(&Crs::parse("epsg:4326").unwrap()).is_ok());
        let err = index
            .ensure_crs(&Crs::parse("EPSG:3435").unwrap())
            .unwrap_err();
        assert!(matches!(err, SpatialError::CrsMismatch { .. }));
    }

    #[test]
    fn ward_ids_are_sorted_and_distinct() {
        let index = WardIndex::build(
            vec![square(4, 0.0, 0.0), square(2, 3.0, 0.0), square(4, 6.0, 0.0)],
            Crs::wgs84(),
        )
        .unwrap();
        assert_eq!(index.ward_ids(), &[WardId(2), WardId(4)]);
        assert_eq!(index.locate(GeoPoint::new(0.5, 6.5)), Some(WardId(4)));
    }
}
