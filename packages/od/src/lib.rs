#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Origin-destination aggregation over ward-assigned trips.
//!
//! A single parametrized [`aggregate`] builds the dense OD matrix for any
//! [`PartitionPredicate`]; [`build_graph`] turns a matrix into a weighted
//! directed flow graph. Ward activity and exploratory breakdowns are
//! computed from the same assigned trips.

pub mod activity;
pub mod breakdown;
pub mod graph;
pub mod matrix;
pub mod partition;

pub use activity::{origin_period_counts, ward_activity};
pub use breakdown::breakdown;
pub use graph::build_graph;
pub use matrix::{OdAggregate, aggregate};
pub use partition::{Partition, PartitionPlan, PartitionPredicate};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use ward_flow_assign::AssignedTrip;
    use ward_flow_trip_models::{AgeGroup, Calendar, GeoPoint, Trip, WardId};

    /// A trip starting on July 1st of `year` at `hour`, or with no
    /// timestamps when `year` is `None`.
    pub fn trip(id: &str, year: Option<i32>, hour: u32, age: Option<u32>) -> Trip {
        let start = year.map(|y| {
            NaiveDate::from_ymd_opt(y, 7, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap()
        });
        Trip {
            id: id.to_string(),
            start_time: start,
            stop_time: start.map(|s| s + chrono::Duration::minutes(15)),
            origin: GeoPoint::new(41.88, -87.63),
            destination: GeoPoint::new(41.89, -87.62),
            vehicle_id: None,
            duration_secs: Some(900.0),
            rider_birth_year: None,
            rider_gender: None,
            calendar: start.as_ref().map(Calendar::from_datetime),
            age,
            age_group: age.map(AgeGroup::from_age),
        }
    }

    pub fn assigned(trip: Trip, origin: Option<WardId>, destination: Option<WardId>) -> AssignedTrip {
        AssignedTrip {
            trip,
            origin_ward: origin,
            destination_ward: destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assigned, trip};
    use ward_flow_trip_models::{AgeGroup, WardId};

    #[test]
    fn two_ward_round_trip_example() {
        let a = WardId(1);
        let b = WardId(2);
        let trips = vec![
            assigned(trip("1", Some(2016), 9, None), Some(a), Some(b)),
            assigned(trip("2", Some(2016), 9, None), Some(a), Some(b)),
            assigned(trip("3", Some(2016), 9, None), Some(b), Some(a)),
        ];

        let result = aggregate(&trips, &Partition::all());
        let graph = build_graph(&result.matrix);

        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edge_weight(a, b), 2);
        assert_eq!(graph.edge_weight(b, a), 1);
        assert_eq!(graph.node(a).map(|n| n.degree), Some(3));
        assert_eq!(graph.node(b).map(|n| n.degree), Some(3));
    }

    #[test]
    fn every_planned_partition_conserves_trips() {
        let trips: Vec<_> = (0..120_u32)
            .map(|i| {
                let year = if i % 5 == 0 { None } else { Some(2016 + (i % 3) as i32) };
                let age = if i % 4 == 0 { None } else { Some(15 + i % 60) };
                let origin = if i % 7 == 0 { None } else { Some(WardId(i % 6)) };
                let destination = if i % 11 == 0 { None } else { Some(WardId(i % 4)) };
                assigned(trip(&i.to_string(), year, i % 24, age), origin, destination)
            })
            .collect();

        let plan = PartitionPlan {
            years: vec![2016, 2017, 2018],
            age_groups: AgeGroup::all().to_vec(),
            day_periods: Vec::new(),
            marginals: true,
        };

        for partition in plan.expand() {
            let result = aggregate(&trips, &partition);
            let d = result.disposition;
            assert_eq!(
                d.resolved + d.origin_only + d.destination_only + d.neither_resolved,
                d.filtered,
                "partition {partition}"
            );
            assert_eq!(result.matrix.total(), d.resolved, "partition {partition}");
        }

        let overall = aggregate(&trips, &Partition::all());
        assert_eq!(overall.disposition.filtered, 120);
    }
}
