//! Partition predicates.
//!
//! A partition selects the subset of trips one OD matrix is built from.
//! [`Partition`] covers the configured calendar and demographic slices;
//! any `Fn(&Trip) -> bool` works as an ad hoc predicate.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use ward_flow_trip_models::{AgeGroup, DayPeriod, Season, Trip};

/// Selects the trips belonging to one partition.
pub trait PartitionPredicate {
    /// Whether `trip` belongs to the partition.
    fn matches(&self, trip: &Trip) -> bool;
}

impl<F> PartitionPredicate for F
where
    F: Fn(&Trip) -> bool,
{
    fn matches(&self, trip: &Trip) -> bool {
        self(trip)
    }
}

/// A conjunction of optional calendar and demographic constraints.
///
/// Unset constraints match every trip. A set constraint never matches a
/// trip that lacks the attribute (e.g. a year constraint rejects trips
/// whose start timestamp did not parse).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Calendar year of the trip start.
    pub year: Option<i32>,
    /// Rider age group.
    pub age_group: Option<AgeGroup>,
    /// Time of day of the trip start.
    pub day_period: Option<DayPeriod>,
    /// Season of the trip start.
    pub season: Option<Season>,
    /// Month of the trip start (1-12).
    pub month: Option<u32>,
}

impl Partition {
    /// The unconstrained partition.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            year: None,
            age_group: None,
            day_period: None,
            season: None,
            month: None,
        }
    }

    /// Restricts to one year.
    #[must_use]
    pub const fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Restricts to one age group.
    #[must_use]
    pub const fn age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_group = Some(age_group);
        self
    }

    /// Restricts to one time-of-day period.
    #[must_use]
    pub const fn day_period(mut self, day_period: DayPeriod) -> Self {
        self.day_period = Some(day_period);
        self
    }

    /// Restricts to one season.
    #[must_use]
    pub const fn season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    /// Restricts to one month of year.
    #[must_use]
    pub const fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// File-name-safe label, e.g. `all`, `2016`, `2017_age-19-30_night`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if let Some(month) = self.month {
            parts.push(format!("m{month:02}"));
        }
        if let Some(season) = self.season {
            parts.push(season.as_ref().to_ascii_lowercase());
        }
        if let Some(group) = self.age_group {
            parts.push(format!("age-{}", group.as_ref().replace('+', "plus")));
        }
        if let Some(period) = self.day_period {
            parts.push(period.as_ref().to_ascii_lowercase());
        }

        if parts.is_empty() {
            return "all".to_string();
        }
        parts.join("_")
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl PartitionPredicate for Partition {
    fn matches(&self, trip: &Trip) -> bool {
        if let Some(group) = self.age_group
            && trip.age_group != Some(group)
        {
            return false;
        }

        let needs_calendar = self.year.is_some()
            || self.month.is_some()
            || self.season.is_some()
            || self.day_period.is_some();
        if !needs_calendar {
            return true;
        }
        let Some(calendar) = trip.calendar.as_ref() else {
            return false;
        };

        self.year.is_none_or(|y| calendar.year == y)
            && self.month.is_none_or(|m| calendar.month == m)
            && self.season.is_none_or(|s| calendar.season == s)
            && self.day_period.is_none_or(|p| calendar.day_period == p)
    }
}

/// The set of partitions a pipeline run produces matrices for.
///
/// Expands to the cartesian product of the configured years, age groups
/// and day periods. An empty dimension is left unconstrained. With
/// `marginals` set, every non-empty dimension also contributes its
/// unconstrained value, so `years = [2016]` and `age_groups = [0-18]` yield
/// `all`, `age-0-18`, `2016` and `2016_age-0-18`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionPlan {
    /// Years to slice by.
    pub years: Vec<i32>,
    /// Age groups to slice by.
    pub age_groups: Vec<AgeGroup>,
    /// Day periods to slice by.
    pub day_periods: Vec<DayPeriod>,
    /// Whether to include the unconstrained value of each dimension.
    pub marginals: bool,
}

impl Default for PartitionPlan {
    fn default() -> Self {
        Self {
            years: Vec::new(),
            age_groups: Vec::new(),
            day_periods: Vec::new(),
            marginals: true,
        }
    }
}

impl PartitionPlan {
    /// Expands the plan into concrete partitions, deduplicated, in a fixed
    /// order: years outermost, then age groups, then day periods.
    #[must_use]
    pub fn expand(&self) -> Vec<Partition> {
        let years = self.dimension(&self.years);
        let age_groups = self.dimension(&self.age_groups);
        let day_periods = self.dimension(&self.day_periods);

        let mut partitions: Vec<Partition> = Vec::new();
        for year in &years {
            for age_group in &age_groups {
                for day_period in &day_periods {
                    let partition = Partition {
                        year: *year,
                        age_group: *age_group,
                        day_period: *day_period,
                        season: None,
                        month: None,
                    };
                    if !partitions.contains(&partition) {
                        partitions.push(partition);
                    }
                }
            }
        }

        let mut summary = String::new();
        for p in &partitions {
            let _ = write!(summary, " {p}");
        }
        log::debug!("Expanded partition plan into {} partitions:{summary}", partitions.len());

        partitions
    }

    fn dimension<T: Copy>(&self, values: &[T]) -> Vec<Option<T>> {
        if values.is_empty() {
            return vec![None];
        }
        let mut out = Vec::with_capacity(values.len() + 1);
        if self.marginals {
            out.push(None);
        }
        out.extend(values.iter().copied().map(Some));
        out
    }
}
