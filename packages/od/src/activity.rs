//! Per-ward start and end activity.

use std::collections::BTreeMap;

use ward_flow_assign::AssignedTrip;
use ward_flow_od_models::{OriginPeriodCount, WardActivity};
use ward_flow_trip_models::{DayPeriod, WardId};

use crate::partition::PartitionPredicate;

/// Counts trip starts and ends per ward for the trips matching
/// `predicate`.
///
/// Each end is counted on its own, so a trip whose destination did not
/// resolve still counts as a start in its origin ward.
pub fn ward_activity<P>(trips: &[AssignedTrip], predicate: &P) -> Vec<WardActivity>
where
    P: PartitionPredicate + ?Sized,
{
    let mut by_ward: BTreeMap<WardId, (u64, u64)> = BTreeMap::new();

    for assigned in trips.iter().filter(|t| predicate.matches(&t.trip)) {
        if let Some(ward) = assigned.origin_ward {
            by_ward.entry(ward).or_default().0 += 1;
        }
        if let Some(ward) = assigned.destination_ward {
            by_ward.entry(ward).or_default().1 += 1;
        }
    }

    by_ward
        .into_iter()
        .map(|(ward, (starts, ends))| WardActivity { ward, starts, ends })
        .collect()
}

/// Counts trip starts per origin ward and time-of-day period.
///
/// Trips without a resolved origin or a parsed start timestamp are skipped.
pub fn origin_period_counts<P>(trips: &[AssignedTrip], predicate: &P) -> Vec<OriginPeriodCount>
where
    P: PartitionPredicate + ?Sized,
{
    let mut counts: BTreeMap<(WardId, DayPeriod), u64> = BTreeMap::new();

    for assigned in trips.iter().filter(|t| predicate.matches(&t.trip)) {
        if let (Some(ward), Some(period)) = (assigned.origin_ward, assigned.trip.day_period()) {
            *counts.entry((ward, period)).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|((ward, day_period), trips)| OriginPeriodCount {
            ward,
            day_period,
            trips,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use crate::test_support::{assigned, trip};

    #[test]
    fn ends_are_counted_independently() {
        let trips = vec![
            assigned(trip("1", Some(2016), 9, None), Some(WardId(1)), Some(WardId(2))),
            assigned(trip("2", Some(2016), 9, None), Some(WardId(1)), None),
            assigned(trip("3", Some(2016), 9, None), None, Some(WardId(1))),
        ];
        let activity = ward_activity(&trips, &Partition::all());
        assert_eq!(
            activity,
            vec![
                WardActivity {
                    ward: WardId(1),
                    starts: 2,
                    ends: 1
                },
                WardActivity {
                    ward: WardId(2),
                    starts: 0,
                    ends: 1
                },
            ]
        );
    }

    #[test]
    fn period_counts_skip_trips_without_timestamps() {
        let trips = vec![
            assigned(trip("1", Some(2016), 2, None), Some(WardId(4)), None),
            assigned(trip("2", Some(2016), 3, None), Some(WardId(4)), None),
            assigned(trip("3", Some(2016), 17, None), Some(WardId(4)), None),
            assigned(trip("4", None, 0, None), Some(WardId(4)), None),
        ];
        let counts = origin_period_counts(&trips, &Partition::all());
        assert_eq!(
            counts,
            vec![
                OriginPeriodCount {
                    ward: WardId(4),
                    day_period: DayPeriod::Night,
                    trips: 2
                },
                OriginPeriodCount {
                    ward: WardId(4),
                    day_period: DayPeriod::Evening,
                    trips: 1
                },
            ]
        );
    }
}
