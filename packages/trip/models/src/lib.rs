#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trip record types, calendar attributes, and rider demographic bins.
//!
//! This crate defines the canonical cleaned trip shared across the whole
//! ward-flow pipeline. Raw CSV rows are normalized into [`Trip`] by the
//! cleaner; every later stage (spatial assignment, OD aggregation,
//! utilization) reads these values and never mutates them.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Identifier of a municipal ward polygon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WardId(pub u32);

impl std::fmt::Display for WardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A trip or boundary point. In a projected CRS `latitude` holds the
/// northing and `longitude` the easting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Meteorological season of the trip start.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Season {
    /// March through May
    Spring,
    /// June through August
    Summer,
    /// September through November
    Autumn,
    /// December through February
    Winter,
}

impl Season {
    /// Maps a calendar month (1-12) to its season.
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Spring, Self::Summer, Self::Autumn, Self::Winter]
    }
}

/// Coarse time-of-day bucket of the trip start.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DayPeriod {
    /// 00:00 to 07:59
    Night,
    /// 08:00 to 15:59
    Day,
    /// 16:00 to 23:59
    Evening,
}

impl DayPeriod {
    /// Maps an hour of day (0-23) to its period.
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            0..=7 => Self::Night,
            8..=15 => Self::Day,
            _ => Self::Evening,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Night, Self::Day, Self::Evening]
    }
}

/// Rider age bucket. Bins are half-open `[lower, upper)` except the last,
/// which is unbounded above.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AgeGroup {
    /// `[0, 19)`
    #[serde(rename = "0-18")]
    #[strum(serialize = "0-18")]
    UpTo18,
    /// `[19, 31)`
    #[serde(rename = "19-30")]
    #[strum(serialize = "19-30")]
    From19To30,
    /// `[31, 41)`
    #[serde(rename = "31-40")]
    #[strum(serialize = "31-40")]
    From31To40,
    /// `[41, 51)`
    #[serde(rename = "41-50")]
    #[strum(serialize = "41-50")]
    From41To50,
    /// `[51, 61)`
    #[serde(rename = "51-60")]
    #[strum(serialize = "51-60")]
    From51To60,
    /// `[61, inf)`
    #[serde(rename = "61+")]
    #[strum(serialize = "61+")]
    From61,
}

impl AgeGroup {
    /// Returns the bin containing `age`.
    #[must_use]
    pub const fn from_age(age: u32) -> Self {
        match age {
            0..=18 => Self::UpTo18,
            19..=30 => Self::From19To30,
            31..=40 => Self::From31To40,
            41..=50 => Self::From41To50,
            51..=60 => Self::From51To60,
            _ => Self::From61,
        }
    }

    /// Returns the inclusive lower bound and exclusive upper bound of this
    /// bin. The last bin has no upper bound.
    #[must_use]
    pub const fn bounds(self) -> (u32, Option<u32>) {
        match self {
            Self::UpTo18 => (0, Some(19)),
            Self::From19To30 => (19, Some(31)),
            Self::From31To40 => (31, Some(41)),
            Self::From41To50 => (41, Some(51)),
            Self::From51To60 => (51, Some(61)),
            Self::From61 => (61, None),
        }
    }

    /// Returns all variants of this enum, youngest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::UpTo18,
            Self::From19To30,
            Self::From31To40,
            Self::From41To50,
            Self::From51To60,
            Self::From61,
        ]
    }
}

/// Rider gender as recorded by the operator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    /// Recorded as male
    Male,
    /// Recorded as female
    Female,
}

/// Calendar attributes derived from a trip's start timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    /// Calendar year.
    pub year: i32,
    /// Month of year (1-12).
    pub month: u32,
    /// Season derived from `month`.
    pub season: Season,
    /// Day of week.
    pub day_of_week: Weekday,
    /// Hour of day (0-23).
    pub hour: u32,
    /// Period derived from `hour`.
    pub day_period: DayPeriod,
}

impl Calendar {
    /// Derives all calendar attributes from a timestamp.
    #[must_use]
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        let month = dt.month();
        let hour = dt.hour();
        Self {
            year: dt.year(),
            month,
            season: Season::from_month(month),
            day_of_week: dt.weekday(),
            hour,
            day_period: DayPeriod::from_hour(hour),
        }
    }
}

/// A cleaned bike-share trip.
///
/// Coordinates are always present. Timestamp-derived and age-derived
/// fields are `None` when the underlying source values were missing or
/// failed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Operator trip identifier.
    pub id: String,
    /// Rental start, if it parsed.
    pub start_time: Option<NaiveDateTime>,
    /// Rental end, if it parsed.
    pub stop_time: Option<NaiveDateTime>,
    /// Pick-up point.
    pub origin: GeoPoint,
    /// Drop-off point.
    pub destination: GeoPoint,
    /// Bicycle identifier.
    pub vehicle_id: Option<String>,
    /// Recorded trip duration in seconds.
    pub duration_secs: Option<f64>,
    /// Rider birth year as recorded (not validated).
    pub rider_birth_year: Option<i32>,
    /// Rider gender.
    pub rider_gender: Option<Gender>,
    /// Calendar attributes of `start_time`.
    pub calendar: Option<Calendar>,
    /// Rider age in the trip year, only for plausible birth years.
    pub age: Option<u32>,
    /// Bin of `age`.
    pub age_group: Option<AgeGroup>,
}

impl Trip {
    /// Returns the trip year, if the start timestamp parsed.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.calendar.as_ref().map(|c| c.year)
    }

    /// Returns the time-of-day period, if the start timestamp parsed.
    #[must_use]
    pub fn day_period(&self) -> Option<DayPeriod> {
        self.calendar.as_ref().map(|c| c.day_period)
    }

    /// Returns the elapsed time between start and stop in seconds, if both
    /// timestamps parsed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self) -> Option<f64> {
        let start = self.start_time?;
        let stop = self.stop_time?;
        Some((stop - start).num_seconds() as f64)
    }
}
