//! Dense OD-matrix aggregation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ward_flow_assign::{AssignedTrip, Resolution};
use ward_flow_od_models::{OdMatrix, PartitionDisposition};
use ward_flow_trip_models::WardId;

use crate::partition::PartitionPredicate;

/// The matrix for one partition and how its trips were disposed of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdAggregate {
    /// Counts for trips with both wards resolved.
    pub matrix: OdMatrix,
    /// Where every matching trip went.
    pub disposition: PartitionDisposition,
}

/// Builds the OD matrix for the trips matching `predicate`.
///
/// The matrix index is the ascending set of wards seen as origin or
/// destination among the partition's fully resolved trips. Trips with an
/// unresolved end are counted in the disposition only. The result does not
/// depend on the order of `trips`.
pub fn aggregate<P>(trips: &[AssignedTrip], predicate: &P) -> OdAggregate
where
    P: PartitionPredicate + ?Sized,
{
    let mut disposition = PartitionDisposition::default();
    let mut cells: BTreeMap<(WardId, WardId), u64> = BTreeMap::new();
    let mut seen: BTreeSet<WardId> = BTreeSet::new();

    for assigned in trips.iter().filter(|t| predicate.matches(&t.trip)) {
        disposition.filtered += 1;
        match assigned.resolution() {
            Resolution::Both(origin, destination) => {
                disposition.resolved += 1;
                seen.insert(origin);
                seen.insert(destination);
                *cells.entry((origin, destination)).or_insert(0) += 1;
            }
            Resolution::OriginOnly => disposition.origin_only += 1,
            Resolution::DestinationOnly => disposition.destination_only += 1,
            Resolution::Neither => disposition.neither_resolved += 1,
        }
    }

    let wards: Vec<WardId> = seen.into_iter().collect();
    let n = wards.len();
    let mut counts = vec![0_u64; n * n];
    for ((origin, destination), count) in cells {
        if let (Ok(i), Ok(j)) = (wards.binary_search(&origin), wards.binary_search(&destination)) {
            counts[i * n + j] = count;
        }
    }

    if disposition.excluded() > 0 {
        log::debug!(
            "{} of {} partition trips excluded from the matrix ({} origin only, {} destination only, {} neither)",
            disposition.excluded(),
            disposition.filtered,
            disposition.origin_only,
            disposition.destination_only,
            disposition.neither_resolved,
        );
    }

    OdAggregate {
        matrix: OdMatrix { wards, counts },
        disposition,
    }
}
