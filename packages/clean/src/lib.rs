#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trip record cleaning and data-quality accounting.
//!
//! Normalizes [`RawTrip`] rows into canonical [`Trip`] values. The coordinate
//! pass and the demographic pass are independent: a trip without
//! coordinates is dropped outright, while a trip with an unparseable
//! timestamp or implausible birth year is kept with the affected derived
//! fields left empty. Every exclusion and degradation is counted in the
//! [`CleanReport`].

pub mod parsing;
pub mod progress;
pub mod reader;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ward_flow_trip_models::{AgeGroup, Calendar, GeoPoint, Gender, Trip};

pub use crate::parsing::CoordinateSpace;
use crate::parsing::{
    DEFAULT_TIMESTAMP_FORMAT, parse_lat_lng_f64, parse_timestamp, parse_wkt_point,
};
use crate::progress::{ProgressCallback, RecordTicker};
pub use crate::reader::{RawTrip, TripTable, read_trips, read_trips_from_path};

/// Number of records between progress updates.
const PROGRESS_STEP: u64 = 50_000;

/// Errors that abort reading or cleaning a trip table.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// CSV parsing failed at the file level.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the trip table.
    #[error("trip table has no column {column:?}")]
    MissingColumn {
        /// Missing column name.
        column: String,
    },

    /// I/O error opening the input.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Which end of a trip a coordinate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripEnd {
    /// Pick-up point.
    Origin,
    /// Drop-off point.
    Destination,
}

/// A per-record defect. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TripDefect {
    /// The record has no usable origin or destination point. The record
    /// is dropped from all analyses.
    #[error("trip {trip_id}: missing {end:?} coordinate")]
    MissingCoordinate {
        /// Trip identifier.
        trip_id: String,
        /// Which end is missing.
        end: TripEnd,
    },

    /// A start or stop timestamp did not parse. Temporal attributes are
    /// left empty.
    #[error("trip {trip_id}: malformed timestamp {value:?}")]
    MalformedTimestamp {
        /// Trip identifier.
        trip_id: String,
        /// Offending text.
        value: String,
    },

    /// The birth year is outside the configured plausible range. The trip is
    /// excluded from age analyses only.
    #[error("trip {trip_id}: implausible birth year {birth_year}")]
    ImplausibleBirthYear {
        /// Trip identifier.
        trip_id: String,
        /// Offending value.
        birth_year: f64,
    },
}

/// Cleaning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// `chrono` format of the start/stop columns.
    pub timestamp_format: String,
    /// Earliest plausible rider birth year.
    pub birth_year_min: i32,
    /// Latest plausible rider birth year. Ages below zero are always
    /// rejected regardless of this bound.
    pub birth_year_max: Option<i32>,
    /// Coordinate interpretation, derived from the trips CRS.
    #[serde(skip)]
    pub coordinates: CoordinateSpace,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            birth_year_min: 1925,
            birth_year_max: None,
            coordinates: CoordinateSpace::Geographic,
        }
    }
}

/// Counts of every exclusion and degradation made while cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanReport {
    /// Records seen.
    pub total_records: u64,
    /// Records kept.
    pub kept: u64,
    /// Records dropped for a missing origin or destination.
    pub missing_coordinate: u64,
    /// Kept records whose timestamps did not parse.
    pub malformed_timestamp: u64,
    /// Kept records with a birth year outside the plausible range.
    pub implausible_birth_year: u64,
    /// Kept records with no birth year at all.
    pub missing_birth_year: u64,
    /// Kept records whose stop time precedes the start time.
    pub reversed_interval: u64,
}

impl CleanReport {
    fn record(&mut self, defect: &TripDefect) {
        match defect {
            TripDefect::MissingCoordinate { .. } => self.missing_coordinate += 1,
            TripDefect::MalformedTimestamp { .. } => self.malformed_timestamp += 1,
            TripDefect::ImplausibleBirthYear { .. } => self.implausible_birth_year += 1,
        }
    }
}

/// Cleaned trips together with the quality report.
#[derive(Debug, Clone, Default)]
pub struct CleanOutput {
    /// Trips with both coordinates, in input order.
    pub trips: Vec<Trip>,
    /// Data-quality counts.
    pub report: CleanReport,
}

/// A normalized trip plus the non-fatal defects found on it.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The cleaned trip.
    pub trip: Trip,
    /// Degradations applied to the trip.
    pub defects: Vec<TripDefect>,
}

/// Cleans a batch of raw trips.
pub fn clean(
    raw: impl IntoIterator<Item = RawTrip>,
    config: &CleanConfig,
    progress: &dyn ProgressCallback,
) -> CleanOutput {
    let mut output = CleanOutput::default();
    let rows = raw.into_iter();
    if let (lower, Some(upper)) = rows.size_hint()
        && lower == upper
    {
        progress.set_total(lower as u64);
    }
    progress.set_message("Cleaning trips".to_string());
    let mut ticker = RecordTicker::new(progress, PROGRESS_STEP);

    for row in rows {
        output.report.total_records += 1;
        ticker.tick();

        let had_birth_year = row.birth_year.is_some();
        match normalize(row, config) {
            Ok(normalized) => {
                for defect in &normalized.defects {
                    log::trace!("{defect}");
                    output.report.record(defect);
                }
                if !had_birth_year {
                    output.report.missing_birth_year += 1;
                }
                if let (Some(start), Some(stop)) =
                    (normalized.trip.start_time, normalized.trip.stop_time)
                    && stop < start
                {
                    output.report.reversed_interval += 1;
                }
                output.report.kept += 1;
                output.trips.push(normalized.trip);
            }
            Err(defect) => {
                log::trace!("{defect}");
                output.report.record(&defect);
            }
        }
    }

    let report = &output.report;
    log::info!(
        "Cleaned {} records: kept {}, dropped {} missing coordinates, \
         {} malformed timestamps, {} implausible birth years",
        report.total_records,
        report.kept,
        report.missing_coordinate,
        report.malformed_timestamp,
        report.implausible_birth_year,
    );
    ticker.finish(format!("Cleaned {} trips", report.kept));

    output
}

/// Normalizes a single raw row.
///
/// # Errors
///
/// Returns [`TripDefect::MissingCoordinate`] if either end of the trip has
/// no usable point. All other defects are reported in
/// [`Normalized::defects`].
pub fn normalize(raw: RawTrip, config: &CleanConfig) -> Result<Normalized, TripDefect> {
    let origin = resolve_point(
        raw.from_latitude,
        raw.from_longitude,
        raw.from_location.as_deref(),
        config.coordinates,
    )
    .ok_or_else(|| TripDefect::MissingCoordinate {
        trip_id: raw.trip_id.clone(),
        end: TripEnd::Origin,
    })?;
    let destination = resolve_point(
        raw.to_latitude,
        raw.to_longitude,
        raw.to_location.as_deref(),
        config.coordinates,
    )
    .ok_or_else(|| TripDefect::MissingCoordinate {
        trip_id: raw.trip_id.clone(),
        end: TripEnd::Destination,
    })?;

    let mut defects = Vec::new();

    let (start_time, stop_time) = match parse_interval(&raw, &config.timestamp_format) {
        Ok(interval) => interval,
        Err(value) => {
            defects.push(TripDefect::MalformedTimestamp {
                trip_id: raw.trip_id.clone(),
                value,
            });
            (None, None)
        }
    };
    let calendar = start_time.as_ref().map(Calendar::from_datetime);

    let mut age = None;
    if let Some(birth_year) = raw.birth_year {
        match plausible_age(birth_year, calendar.map(|c| c.year), config) {
            Ok(computed) => age = computed,
            Err(()) => defects.push(TripDefect::ImplausibleBirthYear {
                trip_id: raw.trip_id.clone(),
                birth_year,
            }),
        }
    }

    let rider_gender = raw
        .gender
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<Gender>().ok());

    let vehicle_id = raw
        .bike_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    #[allow(clippy::cast_possible_truncation)]
    let rider_birth_year = raw
        .birth_year
        .filter(|y| y.is_finite() && y.fract() == 0.0)
        .map(|y| y as i32);

    Ok(Normalized {
        trip: Trip {
            id: raw.trip_id,
            start_time,
            stop_time,
            origin,
            destination,
            vehicle_id,
            duration_secs: raw.trip_duration.filter(|d| d.is_finite() && *d >= 0.0),
            rider_birth_year,
            rider_gender,
            calendar,
            age,
            age_group: age.map(AgeGroup::from_age),
        },
        defects,
    })
}

/// Picks the lat/lon columns first, then the WKT location column.
fn resolve_point(
    lat: Option<f64>,
    lng: Option<f64>,
    location: Option<&str>,
    space: CoordinateSpace,
) -> Option<GeoPoint> {
    parse_lat_lng_f64(lat, lng, space).or_else(|| location.and_then(|s| parse_wkt_point(s, space)))
}

/// Parses both timestamps. Either both succeed or the offending text is
/// returned.
fn parse_interval(
    raw: &RawTrip,
    format: &str,
) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), String> {
    let parse = |value: Option<&String>| -> Result<NaiveDateTime, String> {
        let value = value.map_or("", String::as_str);
        parse_timestamp(value, format).ok_or_else(|| value.to_string())
    };
    let start = parse(raw.start_time.as_ref())?;
    let stop = parse(raw.stop_time.as_ref())?;
    Ok((Some(start), Some(stop)))
}

/// Validates a birth year and computes the age in `trip_year`.
///
/// Returns `Ok(None)` when the birth year is plausible but the trip year is
/// unknown.
fn plausible_age(
    birth_year: f64,
    trip_year: Option<i32>,
    config: &CleanConfig,
) -> Result<Option<u32>, ()> {
    if !birth_year.is_finite() || birth_year.fract() != 0.0 {
        return Err(());
    }
    if birth_year < f64::from(config.birth_year_min) {
        return Err(());
    }
    if config
        .birth_year_max
        .is_some_and(|max| birth_year > f64::from(max))
    {
        return Err(());
    }
    let Some(trip_year) = trip_year else {
        return Ok(None);
    };
    #[allow(clippy::cast_possible_truncation)]
    let age = trip_year - birth_year as i32;
    u32::try_from(age).map(Some).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use ward_flow_trip_models::{DayPeriod, Season};

    fn raw(id: &str) -> RawTrip {
        RawTrip {
            trip_id: id.to_string(),
            start_time: Some("07/04/2016 05:30:00 PM".to_string()),
            stop_time: Some("07/04/2016 05:45:00 PM".to_string()),
            bike_id: Some("101".to_string()),
            trip_duration: Some(900.0),
            gender: Some("Female".to_string()),
            birth_year: Some(1990.0),
            from_latitude: Some(41.88),
            from_longitude: Some(-87.63),
            from_location: None,
            to_latitude: Some(41.89),
            to_longitude: Some(-87.62),
            to_location: None,
        }
    }

    #[test]
    fn normalizes_complete_record() {
        let n = normalize(raw("1"), &CleanConfig::default()).unwrap();
        assert!(n.defects.is_empty());
        let trip = n.trip;
        let cal = trip.calendar.unwrap();
        assert_eq!(cal.year, 2016);
        assert_eq!(cal.season, Season::Summer);
        assert_eq!(cal.day_period, DayPeriod::Evening);
        assert_eq!(trip.age, Some(26));
        assert_eq!(trip.age_group, Some(AgeGroup::From19To30));
        assert_eq!(trip.rider_gender, Some(Gender::Female));
        assert_eq!(trip.vehicle_id.as_deref(), Some("101"));
    }

    #[test]
    fn falls_back_to_wkt_location() {
        let mut row = raw("2");
        row.from_latitude = None;
        row.from_location = Some("POINT (-87.6 41.8)".to_string());
        let trip = normalize(row, &CleanConfig::default()).unwrap().trip;
        assert!((trip.origin.latitude - 41.8).abs() < 1e-9);
    }

    #[test]
    fn missing_coordinate_drops_record() {
        let mut row = raw("3");
        row.to_latitude = None;
        let err = normalize(row, &CleanConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            TripDefect::MissingCoordinate {
                end: TripEnd::Destination,
                ..
            }
        ));
    }

    #[test]
    fn malformed_timestamp_keeps_record_without_calendar() {
        let mut row = raw("4");
        row.stop_time = Some("yesterday".to_string());
        let n = normalize(row, &CleanConfig::default()).unwrap();
        assert_eq!(n.trip.calendar, None);
        assert_eq!(n.trip.start_time, None);
        // Age needs the trip year, so it is absent too, but the birth year
        // itself is not flagged.
        assert_eq!(n.trip.age_group, None);
        assert_eq!(n.trip.rider_birth_year, Some(1990));
        assert_eq!(n.defects.len(), 1);
        assert!(matches!(n.defects[0], TripDefect::MalformedTimestamp { .. }));
    }

    #[test]
    fn sentinel_birth_year_excluded_from_age_only() {
        let mut row = raw("5");
        row.birth_year = Some(1790.0);
        let n = normalize(row, &CleanConfig::default()).unwrap();
        assert_eq!(n.trip.age, None);
        assert_eq!(n.trip.age_group, None);
        assert!(n.trip.calendar.is_some(), "temporal fields must survive");
        assert!(matches!(
            n.defects[0],
            TripDefect::ImplausibleBirthYear { .. }
        ));
    }

    #[test]
    fn negative_age_is_implausible() {
        let mut row = raw("6");
        row.birth_year = Some(2017.0);
        let n = normalize(row, &CleanConfig::default()).unwrap();
        assert_eq!(n.trip.age, None);
        assert_eq!(n.defects.len(), 1);
    }

    #[test]
    fn age_boundary_uses_half_open_bins() {
        let mut row = raw("7");
        row.birth_year = Some(1998.0);
        let trip = normalize(row, &CleanConfig::default()).unwrap().trip;
        assert_eq!(trip.age, Some(18));
        assert_eq!(trip.age_group, Some(AgeGroup::UpTo18));

        let mut row = raw("8");
        row.birth_year = Some(1997.0);
        let trip = normalize(row, &CleanConfig::default()).unwrap().trip;
        assert_eq!(trip.age, Some(19));
        assert_eq!(trip.age_group, Some(AgeGroup::From19To30));
    }

    #[test]
    fn clean_accounts_for_every_record() {
        let mut missing = raw("b");
        missing.from_latitude = None;
        let mut malformed = raw("c");
        malformed.start_time = None;
        let mut no_birth = raw("d");
        no_birth.birth_year = None;
        no_birth.gender = None;
        let mut reversed = raw("e");
        reversed.stop_time = Some("07/04/2016 04:00:00 PM".to_string());
        let mut sentinel = raw("f");
        sentinel.birth_year = Some(1790.0);

        let out = clean(
            vec![raw("a"), missing, malformed, no_birth, reversed, sentinel],
            &CleanConfig::default(),
            &NullProgress,
        );

        assert_eq!(out.report.total_records, 6);
        assert_eq!(out.report.kept, 5);
        assert_eq!(out.report.missing_coordinate, 1);
        assert_eq!(out.report.malformed_timestamp, 1);
        assert_eq!(out.report.missing_birth_year, 1);
        assert_eq!(out.report.reversed_interval, 1);
        assert_eq!(out.report.implausible_birth_year, 1);
        assert_eq!(
            out.report.kept + out.report.missing_coordinate,
            out.report.total_records
        );
        let ids: Vec<&str> = out.trips.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "d", "e", "f"]);
    }

    #[test]
    fn configurable_birth_year_ceiling() {
        let config = CleanConfig {
            birth_year_max: Some(2000),
            ..CleanConfig::default()
        };
        let mut row = raw("9");
        row.birth_year = Some(2005.0);
        let n = normalize(row, &config).unwrap();
        assert_eq!(n.trip.age, None);
        assert_eq!(n.defects.len(), 1);
    }

    #[test]
    fn projected_trips_keep_planar_coordinates() {
        let config = CleanConfig {
            coordinates: CoordinateSpace::Projected,
            ..CleanConfig::default()
        };
        let mut row = raw("p");
        row.from_latitude = Some(1_900_500.0);
        row.from_longitude = Some(1_170_500.0);
        row.to_latitude = None;
        row.to_location = Some("POINT (1171500 1900500)".to_string());

        let out = clean([row.clone()], &config, &NullProgress);
        assert_eq!(out.report.kept, 1);
        assert_eq!(out.report.missing_coordinate, 0);
        assert!((out.trips[0].destination.longitude - 1_171_500.0).abs() < f64::EPSILON);

        let geographic = clean([row], &CleanConfig::default(), &NullProgress);
        assert_eq!(geographic.report.missing_coordinate, 1);
    }
}
