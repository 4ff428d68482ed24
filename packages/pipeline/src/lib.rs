#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch orchestration for ward-flow analysis.
//!
//! Chains the stages of one run: read the trip and ward tables, clean the
//! trips, build the ward index, assign both trip ends to wards, aggregate
//! an OD matrix and flow graph per configured partition, and roll up
//! bicycle utilization. Every stage takes explicit inputs and returns new
//! values; the `*_tables` entry points work on in-memory tables so the
//! whole flow is testable without touching the filesystem.

pub mod config;
pub mod output;
pub mod quality;

use std::sync::Arc;
use std::time::Instant;

use ward_flow_assign::{AssignError, Assignment, assign};
use ward_flow_clean::progress::{ProgressCallback, null_progress};
use ward_flow_clean::reader::{TripTable, read_trips_from_path};
use ward_flow_clean::{CleanConfig, CleanError, CleanOutput, CoordinateSpace, clean};
use ward_flow_od::{
    OdAggregate, Partition, aggregate, build_graph, origin_period_counts, ward_activity,
};
use ward_flow_od_models::{Breakdown, FlowGraph, OriginPeriodCount, WardActivity};
use ward_flow_spatial::{SpatialError, Ward, WardIndex, read_wards_from_path};
use ward_flow_utilization::{UtilizationReport, utilization};

pub use crate::config::{PipelineConfig, load_config};
pub use crate::output::write_outputs;
pub use crate::quality::{PartitionQuality, QualitySummary};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The configuration file is malformed.
    #[error("invalid configuration in {path}: {message}")]
    Config {
        /// Config source.
        path: String,
        /// Parser message.
        message: String,
    },

    /// The trip table could not be read.
    #[error(transparent)]
    Clean(#[from] CleanError),

    /// The ward table or index is unusable.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// Ward assignment failed.
    #[error(transparent)]
    Assign(#[from] AssignError),

    /// Writing a CSV table failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing a JSON document failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error on an output path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Hands out a progress reporter per pipeline stage.
pub trait StageProgress {
    /// Reporter for the stage called `name`.
    fn stage(&self, name: &str) -> Arc<dyn ProgressCallback>;
}

impl<F> StageProgress for F
where
    F: Fn(&str) -> Arc<dyn ProgressCallback>,
{
    fn stage(&self, name: &str) -> Arc<dyn ProgressCallback> {
        self(name)
    }
}

/// Reports nothing.
pub struct Silent;

impl StageProgress for Silent {
    fn stage(&self, _name: &str) -> Arc<dyn ProgressCallback> {
        null_progress()
    }
}

/// Results for one partition.
#[derive(Debug, Clone)]
pub struct PartitionOutput {
    /// The partition.
    pub partition: Partition,
    /// Matrix and disposition.
    pub aggregate: OdAggregate,
    /// Flow graph of the matrix.
    pub graph: FlowGraph,
    /// Starts and ends per ward.
    pub activity: Vec<WardActivity>,
    /// Starts per origin ward and day period.
    pub origin_periods: Vec<OriginPeriodCount>,
}

/// Everything a full run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Data-quality counts.
    pub quality: QualitySummary,
    /// Exploratory counts over all cleaned trips.
    pub breakdown: Breakdown,
    /// One entry per expanded partition, in plan order.
    pub partitions: Vec<PartitionOutput>,
    /// Utilization rollup, if enabled.
    pub utilization: Option<UtilizationReport>,
}

/// Trips cleaned and assigned to wards.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Quality counts through assignment.
    pub quality: QualitySummary,
    /// Assigned trips and their summary.
    pub assignment: Assignment,
}

fn clean_table(
    table: TripTable,
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> (CleanOutput, QualitySummary) {
    let clean_config = CleanConfig {
        coordinates: if config.input.trips_crs.is_wgs84() {
            CoordinateSpace::Geographic
        } else {
            CoordinateSpace::Projected
        },
        ..config.clean.clone()
    };
    let unreadable = table.unreadable_rows;
    let cleaned = clean(table.rows, &clean_config, &*progress.stage("Cleaning trips"));
    let quality = QualitySummary::from_clean(unreadable, &cleaned.report);
    (cleaned, quality)
}

/// Cleans the trip table and assigns every trip to wards.
///
/// The ward index is built and its CRS checked against the trips before
/// any trip is cleaned.
///
/// # Errors
///
/// Returns [`PipelineError::Spatial`] for an empty ward set or a CRS
/// mismatch, or [`PipelineError::Assign`] if assignment fails.
pub fn prepare_tables(
    table: TripTable,
    wards: Vec<Ward>,
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> Result<Prepared, PipelineError> {
    let index = WardIndex::build(wards, config.input.wards_crs.clone())?;
    index.ensure_crs(&config.input.trips_crs)?;

    let (cleaned, quality) = clean_table(table, config, progress);
    let assignment = assign(
        cleaned.trips,
        &config.input.trips_crs,
        &index,
        &config.assign,
        &*progress.stage("Assigning wards"),
    )?;

    Ok(Prepared {
        quality: quality.with_assignment(assignment.summary),
        assignment,
    })
}

/// Runs the full analysis on in-memory tables.
///
/// # Errors
///
/// Returns the same errors as [`prepare_tables`].
pub fn run_tables(
    table: TripTable,
    wards: Vec<Ward>,
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> Result<PipelineOutput, PipelineError> {
    let Prepared {
        mut quality,
        assignment,
    } = prepare_tables(table, wards, config, progress)?;
    let trips = &assignment.trips;

    let plan = config.partitions.expand();
    let bar = progress.stage("Aggregating partitions");
    bar.set_total(plan.len() as u64);

    let mut partitions = Vec::with_capacity(plan.len());
    for partition in plan {
        bar.set_message(format!("Aggregating {partition}"));
        let od = aggregate(trips, &partition);
        let graph = build_graph(&od.matrix);
        log::info!(
            "Partition {partition}: {} wards, {} trips in matrix, {} excluded",
            od.matrix.size(),
            od.disposition.resolved,
            od.disposition.excluded(),
        );
        quality.partitions.push(PartitionQuality {
            partition: partition.label(),
            disposition: od.disposition,
        });
        partitions.push(PartitionOutput {
            activity: ward_activity(trips, &partition),
            origin_periods: origin_period_counts(trips, &partition),
            partition,
            aggregate: od,
            graph,
        });
        bar.inc(1);
    }
    bar.finish(format!("Aggregated {} partitions", partitions.len()));

    let breakdown = ward_flow_od::breakdown(trips.iter().map(|t| &t.trip));
    let rollup = config
        .output
        .utilization
        .then(|| utilization(trips.iter().map(|t| &t.trip), &config.economics));

    Ok(PipelineOutput {
        quality,
        breakdown,
        partitions,
        utilization: rollup,
    })
}

/// Cleans trips and rolls up utilization. No ward table is needed.
#[must_use]
pub fn utilization_tables(
    table: TripTable,
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> (QualitySummary, UtilizationReport) {
    let (cleaned, quality) = clean_table(table, config, progress);
    let report = utilization(&cleaned.trips, &config.economics);
    (quality, report)
}

fn read_inputs(config: &PipelineConfig) -> Result<(TripTable, Vec<Ward>), PipelineError> {
    let wards = read_wards_from_path(&config.input.wards, &config.input.ward_columns)?;
    let table = read_trips_from_path(&config.input.trips)?;
    Ok((table, wards))
}

/// Reads the configured inputs, runs the full analysis and writes every
/// output table.
///
/// # Errors
///
/// Returns any read, structural or write error.
pub fn run(
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> Result<PipelineOutput, PipelineError> {
    let start = Instant::now();
    let (table, wards) = read_inputs(config)?;
    let output = run_tables(table, wards, config, progress)?;
    write_outputs(&output, &config.output)?;
    log::info!("Pipeline finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(output)
}

/// Reads the configured inputs and runs cleaning and assignment only.
///
/// # Errors
///
/// Returns any read or structural error.
pub fn quality(
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> Result<QualitySummary, PipelineError> {
    let (table, wards) = read_inputs(config)?;
    Ok(prepare_tables(table, wards, config, progress)?.quality)
}

/// Reads the trip table, rolls up utilization and writes the utilization
/// tables. The cleaning counts are returned with the report and written
/// as `utilization_quality.json`.
///
/// # Errors
///
/// Returns any read or write error.
pub fn utilization_report(
    config: &PipelineConfig,
    progress: &dyn StageProgress,
) -> Result<(QualitySummary, UtilizationReport), PipelineError> {
    let table = read_trips_from_path(&config.input.trips)?;
    let (quality, report) = utilization_tables(table, config, progress);
    log::info!(
        "Utilization over {} of {} records ({} unreadable, {} missing coordinates, \
         {} malformed timestamps, {} without a bike id)",
        quality.kept,
        quality.total_records,
        quality.unreadable_rows,
        quality.missing_coordinate,
        quality.malformed_timestamp,
        report.summary.trips_without_vehicle,
    );
    output::write_utilization(&report, &config.output.dir)?;
    output::write_utilization_quality(&quality, &config.output.dir)?;
    Ok((quality, report))
}
