//! TOML pipeline configuration.
//!
//! Every section except `[input]` has defaults, so the smallest valid file
//! only names the two input tables:
//!
//! ```toml
//! [input]
//! trips = "data/divvy_trips.csv"
//! wards = "data/wards.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ward_flow_assign::AssignOptions;
use ward_flow_clean::CleanConfig;
use ward_flow_od::PartitionPlan;
use ward_flow_spatial::{Crs, WardColumns};
use ward_flow_utilization::EconomicsConfig;

use crate::PipelineError;

/// Config file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "ward_flow.toml";

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input tables.
    pub input: InputConfig,
    /// Record cleaning.
    #[serde(default)]
    pub clean: CleanConfig,
    /// Spatial assignment.
    #[serde(default)]
    pub assign: AssignOptions,
    /// OD partitions to produce.
    #[serde(default)]
    pub partitions: PartitionPlan,
    /// Utilization and economics.
    #[serde(default)]
    pub economics: EconomicsConfig,
    /// Output location and optional tables.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input table locations and their reference systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Trips CSV.
    pub trips: PathBuf,
    /// Ward boundaries CSV.
    pub wards: PathBuf,
    /// CRS of the trip coordinates.
    #[serde(default)]
    pub trips_crs: Crs,
    /// CRS of the ward boundaries.
    #[serde(default)]
    pub wards_crs: Crs,
    /// Ward table column names.
    #[serde(default)]
    pub ward_columns: WardColumns,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct OutputConfig {
    /// Directory all tables are written to.
    pub dir: PathBuf,
    /// Write `flow_graph_<partition>.json`.
    pub graphs: bool,
    /// Write `ward_activity_<partition>.csv`.
    pub activity: bool,
    /// Write `breakdown.json`.
    pub breakdown: bool,
    /// Run the utilization rollup as part of `run`.
    pub utilization: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            graphs: true,
            activity: true,
            breakdown: true,
            utilization: true,
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration from TOML text. Relative paths are kept as
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the text is not valid TOML or
    /// does not match the expected schema.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        toml::de::from_str(text).map_err(|e| PipelineError::Config {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Resolves relative input and output paths against `base`.
    #[must_use]
    pub fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.input.trips);
        resolve(&mut self.input.wards);
        resolve(&mut self.output.dir);
        self
    }
}

/// Loads a configuration file. Relative paths inside it are resolved
/// against the file's directory.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read, or
/// [`PipelineError::Config`] if it does not parse.
pub fn load_config(path: &Path) -> Result<PipelineConfig, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: PipelineConfig =
        toml::de::from_str(&text).map_err(|e| PipelineError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    log::debug!("Loaded config from {}", path.display());
    Ok(config.relative_to(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_flow_trip_models::AgeGroup;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [input]
            trips = "trips.csv"
            wards = "wards.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.input.trips_crs, Crs::wgs84());
        assert_eq!(config.input.ward_columns, WardColumns::default());
        assert_eq!(config.clean, CleanConfig::default());
        assert_eq!(config.assign, AssignOptions::default());
        assert_eq!(config.partitions, PartitionPlan::default());
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert!((config.economics.rate_per_minute - 0.17).abs() < f64::EPSILON);
    }

    #[test]
    fn full_config_round_trips_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [input]
            trips = "trips.csv"
            wards = "wards.csv"
            trips_crs = "epsg:4326"
            wards_crs = "WGS84"
            ward_columns = { id = "WARD", geometry = "geom" }

            [clean]
            birth_year_min = 1930

            [assign]
            threads = 4
            chunk_size = 500

            [partitions]
            years = [2016, 2017]
            age_groups = ["0-18", "61+"]
            day_periods = ["Night"]
            marginals = false

            [economics]
            rate_per_minute = 0.2
            year = 2019
            costs = { bike = 400.0 }

            [output]
            dir = "out"
            graphs = false
            "#,
        )
        .unwrap();

        assert_eq!(config.input.wards_crs, Crs::wgs84());
        assert_eq!(config.input.ward_columns.id, "WARD");
        assert_eq!(config.clean.birth_year_min, 1930);
        assert_eq!(config.assign.threads, Some(4));
        assert_eq!(config.assign.chunk_size, 500);
        assert_eq!(config.partitions.years, vec![2016, 2017]);
        assert_eq!(
            config.partitions.age_groups,
            vec![AgeGroup::UpTo18, AgeGroup::From61]
        );
        assert!(!config.partitions.marginals);
        assert_eq!(config.economics.year, Some(2019));
        assert!((config.economics.costs.bike - 400.0).abs() < f64::EPSILON);
        assert!((config.economics.costs.infrastructure - 800.0).abs() < f64::EPSILON);
        assert!(!config.output.graphs);
        assert!(config.output.activity);
    }

    #[test]
    fn missing_input_section_is_a_config_error() {
        let err = PipelineConfig::from_toml_str("[output]\ndir = \"x\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn invalid_crs_is_a_config_error() {
        let err = PipelineConfig::from_toml_str(
            "[input]\ntrips = \"t.csv\"\nwards = \"w.csv\"\ntrips_crs = \"mercator\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let config = PipelineConfig::from_toml_str(
            "[input]\ntrips = \"t.csv\"\nwards = \"/abs/w.csv\"\n",
        )
        .unwrap()
        .relative_to(Path::new("/data/run"));
        assert_eq!(config.input.trips, PathBuf::from("/data/run/t.csv"));
        assert_eq!(config.input.wards, PathBuf::from("/abs/w.csv"));
        assert_eq!(config.output.dir, PathBuf::from("/data/run/output"));
    }
}
