//! CSV loader for ward boundary tables.
//!
//! Any failure here is structural: a ward table with an unreadable row or
//! geometry would silently shift assignments for every trip, so the whole
//! load is aborted instead of skipping the row.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ward_flow_trip_models::WardId;

use crate::geometry::parse_boundary;
use crate::{SpatialError, Ward};

/// Column names of the ward table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardColumns {
    /// Column holding the ward number.
    pub id: String,
    /// Column holding the WKT or `GeoJSON` boundary.
    pub geometry: String,
}

impl Default for WardColumns {
    fn default() -> Self {
        Self {
            id: "Ward".to_string(),
            geometry: "the_geom".to_string(),
        }
    }
}

/// Reads wards from any CSV source.
///
/// # Errors
///
/// Returns [`SpatialError::MissingColumn`] if a configured column is absent,
/// [`SpatialError::InvalidWardId`] or [`SpatialError::InvalidGeometry`] for
/// a bad row, or [`SpatialError::Csv`] for malformed CSV.
pub fn read_wards(reader: impl Read, columns: &WardColumns) -> Result<Vec<Ward>, SpatialError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SpatialError::MissingColumn {
                column: name.to_string(),
            })
    };
    let id_idx = find(&columns.id)?;
    let geometry_idx = find(&columns.geometry)?;

    let mut wards = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let id_text = record.get(id_idx).unwrap_or("").trim();
        let id = parse_ward_id(id_text)?;

        let geometry_text = record.get(geometry_idx).unwrap_or("");
        let boundary =
            parse_boundary(geometry_text).map_err(|message| SpatialError::InvalidGeometry {
                ward: id_text.to_string(),
                message,
            })?;

        wards.push(Ward { id, boundary });
    }

    Ok(wards)
}

/// Reads wards from a CSV file on disk.
///
/// # Errors
///
/// Returns [`SpatialError::Io`] if the file cannot be opened, otherwise the
/// same errors as [`read_wards`].
pub fn read_wards_from_path(path: &Path, columns: &WardColumns) -> Result<Vec<Ward>, SpatialError> {
    let file = std::fs::File::open(path).map_err(|e| SpatialError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let wards = read_wards(std::io::BufReader::new(file), columns)?;
    log::info!("Read {} ward boundaries from {}", wards.len(), path.display());
    Ok(wards)
}

/// Parses a ward number, tolerating float-formatted integers (`"12.0"`).
fn parse_ward_id(text: &str) -> Result<WardId, SpatialError> {
    let invalid = || SpatialError::InvalidWardId {
        value: text.to_string(),
    };

    if let Ok(id) = text.parse::<u32>() {
        return Ok(WardId(id));
    }
    let value = text.parse::<f64>().map_err(|_| invalid())?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(invalid());
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(WardId(value as u32))
}
