#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Origin-destination result types.
//!
//! Dense OD matrices, the weighted directed flow graphs derived from them,
//! per-partition assignment dispositions, ward activity rows, and the
//! exploratory trip breakdowns. All types are plain serializable values
//! produced by `ward_flow_od` and written out by the pipeline.

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use ward_flow_trip_models::{AgeGroup, DayPeriod, Gender, Season, WardId};

/// Dense square ward x ward trip-count matrix.
///
/// `wards` is sorted ascending and `counts` is row-major: the cell for
/// origin `wards[i]` and destination `wards[j]` is `counts[i * n + j]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdMatrix {
    /// Row and column index.
    pub wards: Vec<WardId>,
    /// Row-major cell counts, `wards.len()` squared entries.
    pub counts: Vec<u64>,
}

impl OdMatrix {
    /// Number of wards on each axis.
    #[must_use]
    pub fn size(&self) -> usize {
        self.wards.len()
    }

    /// Whether the matrix has no wards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }

    /// Position of `ward` on either axis.
    #[must_use]
    pub fn index_of(&self, ward: WardId) -> Option<usize> {
        self.wards.binary_search(&ward).ok()
    }

    /// Trips from `origin` to `destination`. Wards outside the index
    /// count zero.
    #[must_use]
    pub fn get(&self, origin: WardId, destination: WardId) -> u64 {
        match (self.index_of(origin), self.index_of(destination)) {
            (Some(i), Some(j)) => self.counts[i * self.size() + j],
            _ => 0,
        }
    }

    /// Row of counts for the `i`-th origin ward.
    #[must_use]
    pub fn row(&self, i: usize) -> &[u64] {
        let n = self.size();
        &self.counts[i * n..(i + 1) * n]
    }

    /// Iterates `(origin ward, row)` pairs in index order.
    pub fn rows(&self) -> impl Iterator<Item = (WardId, &[u64])> {
        let n = self.size().max(1);
        self.wards.iter().copied().zip(self.counts.chunks(n))
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// How the trips matching one partition were disposed of.
///
/// `resolved + origin_only + destination_only + neither_resolved` always
/// equals `filtered`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionDisposition {
    /// Trips matching the partition predicate.
    pub filtered: u64,
    /// Trips with both wards resolved; these fill the matrix.
    pub resolved: u64,
    /// Origin resolved, destination not.
    pub origin_only: u64,
    /// Destination resolved, origin not.
    pub destination_only: u64,
    /// Neither end resolved.
    pub neither_resolved: u64,
}

impl PartitionDisposition {
    /// Trips matching the partition that were left out of the matrix.
    #[must_use]
    pub const fn excluded(&self) -> u64 {
        self.origin_only + self.destination_only + self.neither_resolved
    }
}

/// A ward in a [`FlowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Ward id.
    pub ward: WardId,
    /// Sum of outgoing edge weights.
    pub out_weight: u64,
    /// Sum of incoming edge weights.
    pub in_weight: u64,
    /// `out_weight + in_weight`.
    pub degree: u64,
}

/// A directed, weighted flow between two wards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    /// Origin ward.
    pub origin: WardId,
    /// Destination ward.
    pub destination: WardId,
    /// Trip count, always positive.
    pub weight: u64,
}

/// Weighted directed graph of ward-to-ward flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    /// One node per matrix ward, ascending.
    pub nodes: Vec<FlowNode>,
    /// Edges ordered by origin, then destination.
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    /// Looks up a node by ward id.
    #[must_use]
    pub fn node(&self, ward: WardId) -> Option<&FlowNode> {
        self.nodes
            .binary_search_by_key(&ward, |n| n.ward)
            .ok()
            .map(|i| &self.nodes[i])
    }

    /// Weight of the edge from `origin` to `destination`, zero if absent.
    #[must_use]
    pub fn edge_weight(&self, origin: WardId, destination: WardId) -> u64 {
        self.edges
            .binary_search_by_key(&(origin, destination), |e| (e.origin, e.destination))
            .map_or(0, |i| self.edges[i].weight)
    }
}

/// Trip starts and ends observed in one ward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardActivity {
    /// Ward id.
    pub ward: WardId,
    /// Trips whose origin resolved to this ward.
    pub starts: u64,
    /// Trips whose destination resolved to this ward.
    pub ends: u64,
}

impl WardActivity {
    /// `ends - starts`; positive for wards that accumulate bikes.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn net_inflow(&self) -> i64 {
        self.ends as i64 - self.starts as i64
    }
}

/// Trip starts per origin ward and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginPeriodCount {
    /// Origin ward.
    pub ward: WardId,
    /// Period of the trip start.
    pub day_period: DayPeriod,
    /// Trips.
    pub trips: u64,
}

/// Trips on one day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayCount {
    /// Day of week.
    pub weekday: Weekday,
    /// Trips.
    pub trips: u64,
}

/// Trips in one year by one gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearGenderCount {
    /// Calendar year.
    pub year: i32,
    /// Recorded gender.
    pub gender: Gender,
    /// Trips.
    pub trips: u64,
}

/// Trips in one year by one age group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearAgeGroupCount {
    /// Calendar year.
    pub year: i32,
    /// Rider age group.
    pub age_group: AgeGroup,
    /// Trips.
    pub trips: u64,
}

/// Exploratory trip counts over the cleaned trip set.
///
/// Trips without a parsed start timestamp are absent from every
/// calendar-keyed table; trips without a gender or age group are absent
/// from the tables keyed on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// Trips counted.
    pub total: u64,
    /// Trips per year.
    pub by_year: BTreeMap<i32, u64>,
    /// Trips per month of year (1-12).
    pub by_month: BTreeMap<u32, u64>,
    /// Trips per season.
    pub by_season: BTreeMap<Season, u64>,
    /// Trips per weekday, Monday first.
    pub by_weekday: Vec<WeekdayCount>,
    /// Trips per year and gender.
    pub by_year_gender: Vec<YearGenderCount>,
    /// Trips per age group.
    pub by_age_group: BTreeMap<AgeGroup, u64>,
    /// Trips per year and age group.
    pub by_year_age_group: Vec<YearAgeGroupCount>,
    /// Distinct bicycles seen per year.
    pub vehicles_by_year: BTreeMap<i32, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> OdMatrix {
        OdMatrix {
            wards: vec![WardId(1), WardId(4)],
            counts: vec![0, 2, 1, 0],
        }
    }

    #[test]
    fn cell_lookup_is_row_major() {
        let m = matrix();
        assert_eq!(m.get(WardId(1), WardId(4)), 2);
        assert_eq!(m.get(WardId(4), WardId(1)), 1);
        assert_eq!(m.get(WardId(1), WardId(1)), 0);
        assert_eq!(m.get(WardId(9), WardId(1)), 0);
        assert_eq!(m.row(1), &[1, 0]);
        assert_eq!(m.total(), 3);
    }

    #[test]
    fn rows_follow_ward_order() {
        let m = matrix();
        let rows: Vec<(WardId, Vec<u64>)> = m.rows().map(|(w, r)| (w, r.to_vec())).collect();
        assert_eq!(rows, vec![(WardId(1), vec![0, 2]), (WardId(4), vec![1, 0])]);
        assert_eq!(OdMatrix::default().rows().count(), 0);
    }

    #[test]
    fn disposition_excluded_sums_unresolved_buckets() {
        let d = PartitionDisposition {
            filtered: 10,
            resolved: 6,
            origin_only: 2,
            destination_only: 1,
            neither_resolved: 1,
        };
        assert_eq!(d.excluded(), 4);
        assert_eq!(d.resolved + d.excluded(), d.filtered);
    }

    #[test]
    fn net_inflow_is_signed() {
        let a = WardActivity {
            ward: WardId(3),
            starts: 5,
            ends: 2,
        };
        assert_eq!(a.net_inflow(), -3);
    }

    #[test]
    fn breakdown_serializes_enum_keys_as_labels() {
        let mut b = Breakdown::default();
        b.by_age_group.insert(AgeGroup::From19To30, 4);
        b.by_season.insert(Season::Summer, 7);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["byAgeGroup"]["19-30"], 4);
        assert_eq!(json["bySeason"]["Summer"], 7);
    }
}
