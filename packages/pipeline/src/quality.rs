//! Run-level data-quality summary.

use serde::{Deserialize, Serialize};
use ward_flow_assign::AssignmentSummary;
use ward_flow_clean::CleanReport;
use ward_flow_od_models::PartitionDisposition;

/// Disposition of one partition's trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionQuality {
    /// Partition label.
    pub partition: String,
    /// Trip counts by assignment outcome.
    #[serde(flatten)]
    pub disposition: PartitionDisposition,
}

/// Every exclusion and degradation made during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySummary {
    /// Rows the CSV reader could not deserialize.
    pub unreadable_rows: u64,
    /// Rows handed to the cleaner.
    pub total_records: u64,
    /// Trips kept after cleaning.
    pub kept: u64,
    /// Trips dropped for a missing coordinate.
    pub missing_coordinate: u64,
    /// Kept trips with unparseable timestamps.
    pub malformed_timestamp: u64,
    /// Kept trips with an implausible birth year.
    pub implausible_birth_year: u64,
    /// Kept trips with no birth year.
    pub missing_birth_year: u64,
    /// Kept trips that stop before they start.
    pub reversed_interval: u64,
    /// Trips whose origin fell outside every ward.
    pub unresolved_origin: u64,
    /// Trips whose destination fell outside every ward.
    pub unresolved_destination: u64,
    /// Trips with neither end in a ward.
    pub unresolved_both: u64,
    /// Assignment outcome counts, if assignment ran.
    pub assignment: Option<AssignmentSummary>,
    /// Per-partition dispositions.
    pub partitions: Vec<PartitionQuality>,
}

impl QualitySummary {
    /// Summary of the cleaning stage alone.
    #[must_use]
    pub const fn from_clean(unreadable_rows: u64, report: &CleanReport) -> Self {
        Self {
            unreadable_rows,
            total_records: report.total_records,
            kept: report.kept,
            missing_coordinate: report.missing_coordinate,
            malformed_timestamp: report.malformed_timestamp,
            implausible_birth_year: report.implausible_birth_year,
            missing_birth_year: report.missing_birth_year,
            reversed_interval: report.reversed_interval,
            unresolved_origin: 0,
            unresolved_destination: 0,
            unresolved_both: 0,
            assignment: None,
            partitions: Vec::new(),
        }
    }

    /// Adds the assignment outcome.
    #[must_use]
    pub const fn with_assignment(mut self, summary: AssignmentSummary) -> Self {
        self.unresolved_origin = summary.unresolved_origin();
        self.unresolved_destination = summary.unresolved_destination();
        self.unresolved_both = summary.neither_resolved;
        self.assignment = Some(summary);
        self
    }

    /// Pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
