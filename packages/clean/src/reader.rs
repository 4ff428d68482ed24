//! CSV reader for raw trip exports.
//!
//! Column names follow the City of Chicago Divvy trip export. Numeric
//! columns that fail to parse become `None` so the cleaner can account
//! for them instead of losing the whole row.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::CleanError;

/// One row of the raw trip export, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTrip {
    /// Operator trip identifier.
    #[serde(rename = "TRIP ID")]
    pub trip_id: String,
    /// Start timestamp text.
    #[serde(rename = "START TIME", default)]
    pub start_time: Option<String>,
    /// Stop timestamp text.
    #[serde(rename = "STOP TIME", default)]
    pub stop_time: Option<String>,
    /// Bicycle identifier.
    #[serde(rename = "BIKE ID", default)]
    pub bike_id: Option<String>,
    /// Recorded duration in seconds.
    #[serde(
        rename = "TRIP DURATION",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub trip_duration: Option<f64>,
    /// Rider gender text.
    #[serde(rename = "GENDER", default)]
    pub gender: Option<String>,
    /// Rider birth year. Parsed as a float because re-exported tables
    /// carry values like `1990.0`.
    #[serde(rename = "BIRTH YEAR", default, deserialize_with = "csv::invalid_option")]
    pub birth_year: Option<f64>,
    /// Origin latitude.
    #[serde(
        rename = "FROM LATITUDE",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub from_latitude: Option<f64>,
    /// Origin longitude.
    #[serde(
        rename = "FROM LONGITUDE",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub from_longitude: Option<f64>,
    /// Origin as WKT point text.
    #[serde(rename = "FROM LOCATION", default)]
    pub from_location: Option<String>,
    /// Destination latitude.
    #[serde(
        rename = "TO LATITUDE",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub to_latitude: Option<f64>,
    /// Destination longitude.
    #[serde(
        rename = "TO LONGITUDE",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub to_longitude: Option<f64>,
    /// Destination as WKT point text.
    #[serde(rename = "TO LOCATION", default)]
    pub to_location: Option<String>,
}

/// Header of the only column every trip table must carry.
pub const TRIP_ID_COLUMN: &str = "TRIP ID";

/// Raw rows read from a trip export.
#[derive(Debug, Clone, Default)]
pub struct TripTable {
    /// Successfully deserialized rows, in file order.
    pub rows: Vec<RawTrip>,
    /// Rows the CSV layer could not deserialize at all.
    pub unreadable_rows: u64,
}

/// Reads raw trips from any CSV source.
///
/// # Errors
///
/// Returns [`CleanError::Csv`] if the header row cannot be read, or
/// [`CleanError::MissingColumn`] if it has no `TRIP ID` column.
pub fn read_trips(reader: impl Read) -> Result<TripTable, CleanError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    if !csv_reader.headers()?.iter().any(|h| h == TRIP_ID_COLUMN) {
        return Err(CleanError::MissingColumn {
            column: TRIP_ID_COLUMN.to_string(),
        });
    }

    let mut table = TripTable::default();
    for result in csv_reader.deserialize::<RawTrip>() {
        match result {
            Ok(row) => table.rows.push(row),
            Err(e) => {
                log::trace!("skipping unreadable trip row: {e}");
                table.unreadable_rows += 1;
            }
        }
    }

    if table.unreadable_rows > 0 {
        log::warn!("Skipped {} unreadable trip rows", table.unreadable_rows);
    }

    Ok(table)
}

/// Reads raw trips from a CSV file on disk.
///
/// # Errors
///
/// Returns [`CleanError::Io`] if the file cannot be opened, or the errors
/// of [`read_trips`].
pub fn read_trips_from_path(path: &Path) -> Result<TripTable, CleanError> {
    let file = std::fs::File::open(path).map_err(|e| CleanError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let table = read_trips(std::io::BufReader::new(file))?;
    log::info!("Read {} trip rows from {}", table.rows.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "TRIP ID,START TIME,STOP TIME,BIKE ID,TRIP DURATION,GENDER,BIRTH YEAR,\
FROM LATITUDE,FROM LONGITUDE,FROM LOCATION,TO LATITUDE,TO LONGITUDE,TO LOCATION";

    #[test]
    fn reads_complete_row() {
        let csv = format!(
            "{HEADER}\n1,06/27/2016 01:06:00 PM,06/27/2016 01:16:00 PM,42,600,Male,1990,\
41.88,-87.63,POINT (-87.63 41.88),41.89,-87.62,POINT (-87.62 41.89)\n"
        );
        let table = read_trips(csv.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.unreadable_rows, 0);

        let row = &table.rows[0];
        assert_eq!(row.trip_id, "1");
        assert_eq!(row.bike_id.as_deref(), Some("42"));
        assert_eq!(row.birth_year, Some(1990.0));
        assert_eq!(row.to_location.as_deref(), Some("POINT (-87.62 41.89)"));
    }

    #[test]
    fn empty_and_garbage_numbers_become_none() {
        let csv = format!("{HEADER}\n2,,,,abc,,,,,,,,\n");
        let table = read_trips(csv.as_bytes()).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.trip_duration, None);
        assert_eq!(row.birth_year, None);
        assert_eq!(row.from_latitude, None);
        assert_eq!(row.start_time, None);
    }

    #[test]
    fn missing_optional_columns_default() {
        let csv = "TRIP ID,FROM LATITUDE,FROM LONGITUDE,TO LATITUDE,TO LONGITUDE\n\
7,41.0,-87.0,41.1,-87.1\n";
        let table = read_trips(csv.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].from_latitude, Some(41.0));
        assert_eq!(table.rows[0].gender, None);
    }

    #[test]
    fn missing_trip_id_header_is_fatal() {
        let csv = "TRIP_ID,FROM LATITUDE,FROM LONGITUDE\n7,41.0,-87.0\n";
        let err = read_trips(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CleanError::MissingColumn { ref column } if column == "TRIP ID"));
    }

    #[test]
    fn padded_trip_id_header_is_accepted() {
        let csv = " TRIP ID ,FROM LATITUDE\n7,41.0\n";
        let table = read_trips(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].trip_id, "7");
    }
}
