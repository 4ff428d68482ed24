#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Origin/destination ward assignment.
//!
//! Resolves both ends of every cleaned trip against a shared, immutable
//! [`WardIndex`]. Trips are split into chunks that are resolved on the
//! `rayon` pool and gathered back in input order, so the output is
//! identical for any thread count.

use std::ops::AddAssign;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use ward_flow_clean::progress::ProgressCallback;
use ward_flow_spatial::{Crs, SpatialError, WardIndex};
use ward_flow_trip_models::{Trip, WardId};

/// Errors that abort assignment before any point is resolved.
#[derive(Debug, thiserror::Error)]
pub enum AssignError {
    /// The trips cannot be queried against the index.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// A dedicated worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Assignment tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignOptions {
    /// Worker threads. `None` uses the global `rayon` pool.
    pub threads: Option<usize>,
    /// Trips per work unit.
    pub chunk_size: usize,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            threads: None,
            chunk_size: 10_000,
        }
    }
}

/// A trip with the wards its two ends fall in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTrip {
    /// The cleaned trip.
    pub trip: Trip,
    /// Ward of the pick-up point.
    pub origin_ward: Option<WardId>,
    /// Ward of the drop-off point.
    pub destination_ward: Option<WardId>,
}

/// How far a trip's assignment got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Both ends resolved.
    Both(WardId, WardId),
    /// Only the origin resolved.
    OriginOnly,
    /// Only the destination resolved.
    DestinationOnly,
    /// Neither end resolved.
    Neither,
}

impl AssignedTrip {
    /// Classifies this trip's assignment.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        match (self.origin_ward, self.destination_ward) {
            (Some(o), Some(d)) => Resolution::Both(o, d),
            (Some(_), None) => Resolution::OriginOnly,
            (None, Some(_)) => Resolution::DestinationOnly,
            (None, None) => Resolution::Neither,
        }
    }
}

/// Assignment-quality counts. Every trip lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    /// Trips processed.
    pub total: u64,
    /// Both ends resolved.
    pub both_resolved: u64,
    /// Origin resolved, destination outside every ward.
    pub origin_only: u64,
    /// Destination resolved, origin outside every ward.
    pub destination_only: u64,
    /// Neither end resolved.
    pub neither_resolved: u64,
}

impl AssignmentSummary {
    /// Counts one trip.
    pub const fn record(&mut self, resolution: Resolution) {
        self.total += 1;
        match resolution {
            Resolution::Both(..) => self.both_resolved += 1,
            Resolution::OriginOnly => self.origin_only += 1,
            Resolution::DestinationOnly => self.destination_only += 1,
            Resolution::Neither => self.neither_resolved += 1,
        }
    }

    /// Trips whose origin did not resolve.
    #[must_use]
    pub const fn unresolved_origin(&self) -> u64 {
        self.destination_only + self.neither_resolved
    }

    /// Trips whose destination did not resolve.
    #[must_use]
    pub const fn unresolved_destination(&self) -> u64 {
        self.origin_only + self.neither_resolved
    }

    /// Trips with exactly one end resolved.
    #[must_use]
    pub const fn exactly_one_resolved(&self) -> u64 {
        self.origin_only + self.destination_only
    }
}

impl AddAssign for AssignmentSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.both_resolved += rhs.both_resolved;
        self.origin_only += rhs.origin_only;
        self.destination_only += rhs.destination_only;
        self.neither_resolved += rhs.neither_resolved;
    }
}

/// Assigned trips plus their quality summary.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    /// Trips in input order.
    pub trips: Vec<AssignedTrip>,
    /// Counts by resolution.
    pub summary: AssignmentSummary,
}

/// Resolves origin and destination wards for every trip.
///
/// The CRS check runs before any lookup, so a mismatch aborts without
/// partial output.
///
/// # Errors
///
/// Returns [`AssignError::Spatial`] on a CRS mismatch, or
/// [`AssignError::ThreadPool`] if a dedicated pool was requested and could
/// not be built.
pub fn assign(
    trips: Vec<Trip>,
    trips_crs: &Crs,
    index: &WardIndex,
    options: &AssignOptions,
    progress: &dyn ProgressCallback,
) -> Result<Assignment, AssignError> {
    index.ensure_crs(trips_crs)?;

    let chunk_size = options.chunk_size.max(1);
    progress.set_total(trips.len() as u64);
    progress.set_message("Assigning wards".to_string());

    let run = move || -> Vec<(Vec<AssignedTrip>, AssignmentSummary)> {
        trips
            .into_par_iter()
            .chunks(chunk_size)
            .map(|chunk| {
                let len = chunk.len() as u64;
                let resolved = resolve_chunk(chunk, index);
                progress.inc(len);
                resolved
            })
            .collect()
    };

    let parts = match options.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run),
        None => run(),
    };

    let mut assignment = Assignment::default();
    for (chunk, summary) in parts {
        assignment.trips.extend(chunk);
        assignment.summary += summary;
    }

    let summary = &assignment.summary;
    log::info!(
        "Assigned {} trips: {} fully resolved, {} origin only, {} destination only, {} unresolved",
        summary.total,
        summary.both_resolved,
        summary.origin_only,
        summary.destination_only,
        summary.neither_resolved,
    );
    progress.finish(format!("Assigned {} trips", summary.total));

    Ok(assignment)
}

fn resolve_chunk(chunk: Vec<Trip>, index: &WardIndex) -> (Vec<AssignedTrip>, AssignmentSummary) {
    let mut summary = AssignmentSummary::default();
    let assigned = chunk
        .into_iter()
        .map(|trip| {
            let assigned = AssignedTrip {
                origin_ward: index.locate(trip.origin),
                destination_ward: index.locate(trip.destination),
                trip,
            };
            summary.record(assigned.resolution());
            assigned
        })
        .collect();
    (assigned, summary)
}
