//! Output table writers.
//!
//! Each writer targets any [`std::io::Write`] so the formats can be checked
//! in memory; [`write_outputs`] lays the tables out in a directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use ward_flow_od_models::{OdMatrix, WardActivity};
use ward_flow_utilization::{UtilizationReport, VehicleWeekdayUtilization};

use crate::config::OutputConfig;
use crate::{PipelineError, PipelineOutput, QualitySummary};

/// Writes a matrix as CSV: header `origin_ward,<ward ids...>`, then one row
/// per origin ward.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if writing fails.
pub fn write_matrix_csv(matrix: &OdMatrix, writer: impl Write) -> Result<(), PipelineError> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(matrix.size() + 1);
    header.push("origin_ward".to_string());
    header.extend(matrix.wards.iter().map(ToString::to_string));
    csv.write_record(&header)?;

    for (origin, row) in matrix.rows() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(origin.to_string());
        record.extend(row.iter().map(ToString::to_string));
        csv.write_record(&record)?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes per-ward activity as CSV with a net inflow column.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if writing fails.
pub fn write_activity_csv(
    activity: &[WardActivity],
    writer: impl Write,
) -> Result<(), PipelineError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["ward", "starts", "ends", "net_inflow"])?;
    for row in activity {
        csv.write_record([
            row.ward.to_string(),
            row.starts.to_string(),
            row.ends.to_string(),
            row.net_inflow().to_string(),
        ])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes serializable rows as CSV with a header taken from the field
/// names.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if serialization or writing fails.
pub fn write_rows_csv<T: Serialize>(rows: &[T], writer: impl Write) -> Result<(), PipelineError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes a value as pretty JSON and flushes the writer.
///
/// # Errors
///
/// Returns [`PipelineError::Json`] if serialization, writing or flushing
/// fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, writer: impl Write) -> Result<(), PipelineError> {
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

fn create_dir(dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::Io {
        path: dir.display().to_string(),
        source: e,
    })
}

fn create(dir: &Path, name: &str) -> Result<(PathBuf, BufWriter<File>), PipelineError> {
    let path = dir.join(name);
    let file = File::create(&path).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok((path, BufWriter::new(file)))
}

/// Writes the utilization tables into `dir`.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if a file cannot be created, or a CSV or
/// JSON error if writing fails.
pub fn write_utilization(
    report: &UtilizationReport,
    dir: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    create_dir(dir)?;

    let mut written = Vec::new();

    let (path, file) = create(dir, "utilization.csv")?;
    write_rows_csv(&report.vehicles, file)?;
    written.push(path);

    let (path, file) = create(dir, "utilization_weekday.csv")?;
    write_rows_csv::<VehicleWeekdayUtilization>(&report.vehicle_weekdays, file)?;
    written.push(path);

    let (path, file) = create(dir, "utilization_summary.json")?;
    write_json(&report.summary, file)?;
    written.push(path);

    Ok(written)
}

/// Writes the cleaning counts of a utilization-only run into `dir` as
/// `utilization_quality.json`.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be created, or
/// [`PipelineError::Json`] if writing fails.
pub fn write_utilization_quality(
    quality: &QualitySummary,
    dir: &Path,
) -> Result<PathBuf, PipelineError> {
    create_dir(dir)?;
    let (path, file) = create(dir, "utilization_quality.json")?;
    write_json(quality, file)?;
    Ok(path)
}

/// Writes every table of a pipeline run into `config.dir` and returns the
/// paths written.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the directory or a file cannot be
/// created, or a CSV or JSON error if writing fails.
pub fn write_outputs(
    output: &PipelineOutput,
    config: &OutputConfig,
) -> Result<Vec<PathBuf>, PipelineError> {
    let dir = config.dir.as_path();
    create_dir(dir)?;

    let mut written = Vec::new();

    for partition in &output.partitions {
        let label = partition.partition.label();

        let (path, file) = create(dir, &format!("od_matrix_{label}.csv"))?;
        write_matrix_csv(&partition.aggregate.matrix, file)?;
        written.push(path);

        if config.graphs {
            let (path, file) = create(dir, &format!("flow_graph_{label}.json"))?;
            write_json(&partition.graph, file)?;
            written.push(path);
        }

        if config.activity {
            let (path, file) = create(dir, &format!("ward_activity_{label}.csv"))?;
            write_activity_csv(&partition.activity, file)?;
            written.push(path);

            let (path, file) = create(dir, &format!("ward_day_periods_{label}.csv"))?;
            write_rows_csv(&partition.origin_periods, file)?;
            written.push(path);
        }
    }

    let (path, file) = create(dir, "quality_summary.json")?;
    write_json(&output.quality, file)?;
    written.push(path);

    if config.breakdown {
        let (path, file) = create(dir, "breakdown.json")?;
        write_json(&output.breakdown, file)?;
        written.push(path);
    }

    if let Some(report) = &output.utilization {
        written.extend(write_utilization(report, dir)?);
    }

    log::info!("Wrote {} output files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_flow_trip_models::WardId;

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn json_write_failure_behind_buffer_is_reported() {
        let err = write_json(&QualitySummary::default(), BufWriter::new(BrokenDisk)).unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)), "{err}");
    }

    #[test]
    fn json_ends_with_newline() {
        let mut buf = Vec::new();
        write_json(&[1, 2], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[\n  1,\n  2\n]\n");
    }

    #[test]
    fn matrix_csv_layout() {
        let matrix = OdMatrix {
            wards: vec![WardId(3), WardId(12)],
            counts: vec![0, 2, 1, 5],
        };
        let mut buf = Vec::new();
        write_matrix_csv(&matrix, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "origin_ward,3,12\n3,0,2\n12,1,5\n"
        );
    }

    #[test]
    fn empty_matrix_writes_header_only() {
        let mut buf = Vec::new();
        write_matrix_csv(&OdMatrix::default(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "origin_ward\n");
    }

    #[test]
    fn activity_csv_includes_net_inflow() {
        let activity = vec![WardActivity {
            ward: WardId(1),
            starts: 4,
            ends: 6,
        }];
        let mut buf = Vec::new();
        write_activity_csv(&activity, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "ward,starts,ends,net_inflow\n1,4,6,2\n"
        );
    }

    #[test]
    fn utilization_quality_lands_next_to_the_rollup() {
        let dir = std::env::temp_dir().join(format!("ward_flow_util_quality_{}", std::process::id()));
        let quality = QualitySummary {
            total_records: 7,
            kept: 5,
            ..QualitySummary::default()
        };

        let path = write_utilization_quality(&quality, &dir).unwrap();
        assert_eq!(path, dir.join("utilization_quality.json"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["totalRecords"], 7);
        assert_eq!(json["kept"], 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
