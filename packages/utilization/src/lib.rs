#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bicycle utilization and fleet economics.
//!
//! Rolls cleaned trips up per bicycle: ride minutes, the span between the
//! bicycle's first rental start and last rental stop, utilization as the
//! share of that span spent riding, and revenue at a per-minute rate. The
//! fleet summary compares total revenue against a per-bicycle annual cost
//! model.

pub mod stats;

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use ward_flow_trip_models::Trip;

use crate::stats::Distribution;

/// Annual cost components per bicycle, in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Purchase price, amortized per year.
    pub bike: f64,
    /// Repairs and servicing.
    pub maintenance: f64,
    /// Docks and stations.
    pub infrastructure: f64,
    /// Software and telemetry.
    pub technology: f64,
    /// Insurance.
    pub insurance: f64,
    /// Rebalancing and staff.
    pub operations: f64,
    /// Marketing.
    pub marketing: f64,
    /// Unexpected costs.
    pub contingency: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            bike: 300.0,
            maintenance: 50.0,
            infrastructure: 800.0,
            technology: 30.0,
            insurance: 10.0,
            operations: 60.0,
            marketing: 20.0,
            contingency: 20.0,
        }
    }
}

impl CostModel {
    /// Total annual cost of one bicycle.
    #[must_use]
    pub fn per_bike(&self) -> f64 {
        self.bike
            + self.maintenance
            + self.infrastructure
            + self.technology
            + self.insurance
            + self.operations
            + self.marketing
            + self.contingency
    }
}

/// Economics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    /// Rental price in USD per ride minute.
    pub rate_per_minute: f64,
    /// Restrict the rollup to trips starting in this year.
    pub year: Option<i32>,
    /// Per-bicycle annual costs.
    pub costs: CostModel,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            rate_per_minute: 0.17,
            year: None,
            costs: CostModel::default(),
        }
    }
}

/// Usage of one bicycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleUtilization {
    /// Bicycle identifier.
    pub vehicle_id: String,
    /// Trips ridden.
    pub trips: u64,
    /// Minutes ridden.
    pub ride_minutes: f64,
    /// Earliest rental start.
    pub first_start: Option<NaiveDateTime>,
    /// Latest rental stop.
    pub last_stop: Option<NaiveDateTime>,
    /// Minutes between `first_start` and `last_stop`.
    pub active_minutes: Option<f64>,
    /// `ride_minutes / active_minutes * 100`, undefined for a zero span.
    pub utilization_pct: Option<f64>,
    /// `ride_minutes * rate_per_minute`.
    pub revenue: f64,
}

/// Usage of one bicycle on one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleWeekdayUtilization {
    /// Bicycle identifier.
    pub vehicle_id: String,
    /// Day of week.
    pub weekday: Weekday,
    /// Minutes ridden on this weekday.
    pub ride_minutes: f64,
    /// Span from first start to last stop among this weekday's trips.
    pub active_minutes: Option<f64>,
    /// Utilization over that span.
    pub utilization_pct: Option<f64>,
}

/// Utilization across the fleet on one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayUtilization {
    /// Day of week.
    pub weekday: Weekday,
    /// Bicycles with a defined utilization on this weekday.
    pub vehicles: u64,
    /// Mean utilization %.
    pub mean_pct: f64,
    /// Median utilization %.
    pub median_pct: f64,
}

/// Fleet-level figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    /// Year filter applied, if any.
    pub year: Option<i32>,
    /// Trips rolled up.
    pub trips: u64,
    /// Trips skipped because they had no bicycle id.
    pub trips_without_vehicle: u64,
    /// Distinct bicycles.
    pub fleet_size: u64,
    /// Bicycles with a defined utilization.
    pub vehicles_with_utilization: u64,
    /// Minutes ridden across the fleet.
    pub total_ride_minutes: f64,
    /// Utilization distribution over bicycles.
    pub utilization: Option<Distribution>,
    /// Revenue across the fleet in USD.
    pub total_revenue: f64,
    /// Annual cost of one bicycle in USD.
    pub cost_per_bike: f64,
    /// `fleet_size * cost_per_bike`.
    pub total_cost: f64,
    /// `total_revenue - total_cost`.
    pub margin: f64,
    /// Mean and median utilization per weekday, Monday first.
    pub by_weekday: Vec<WeekdayUtilization>,
}

/// Full utilization rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationReport {
    /// One row per bicycle, ordered by id.
    pub vehicles: Vec<VehicleUtilization>,
    /// One row per bicycle and weekday.
    pub vehicle_weekdays: Vec<VehicleWeekdayUtilization>,
    /// Fleet totals.
    pub summary: FleetSummary,
}

impl UtilizationReport {
    /// The `n` bicycles with the highest revenue, highest first.
    #[must_use]
    pub fn top_earners(&self, n: usize) -> Vec<&VehicleUtilization> {
        let mut sorted: Vec<&VehicleUtilization> = self.vehicles.iter().collect();
        sorted.sort_by(|a, b| {
            b.revenue
                .total_cmp(&a.revenue)
                .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
        });
        sorted.truncate(n);
        sorted
    }
}

#[derive(Default)]
struct Usage {
    trips: u64,
    ride_minutes: f64,
    first_start: Option<NaiveDateTime>,
    last_stop: Option<NaiveDateTime>,
}

impl Usage {
    fn add(&mut self, trip: &Trip, minutes: f64) {
        self.trips += 1;
        self.ride_minutes += minutes;
        if let Some(start) = trip.start_time {
            self.first_start = Some(self.first_start.map_or(start, |s| s.min(start)));
        }
        if let Some(stop) = trip.stop_time {
            self.last_stop = Some(self.last_stop.map_or(stop, |s| s.max(stop)));
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn active_minutes(&self) -> Option<f64> {
        let span = self.last_stop? - self.first_start?;
        Some(span.num_seconds() as f64 / 60.0)
    }

    fn utilization_pct(&self) -> Option<f64> {
        self.active_minutes()
            .filter(|active| *active > 0.0)
            .map(|active| self.ride_minutes / active * 100.0)
    }
}

/// Minutes ridden: the recorded duration, else the stop-start span.
/// Negative values are treated as missing.
fn ride_minutes(trip: &Trip) -> f64 {
    trip.duration_secs
        .or_else(|| trip.elapsed_secs())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(0.0, |secs| secs / 60.0)
}

/// Rolls trips up per bicycle and across the fleet.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn utilization<'a>(
    trips: impl IntoIterator<Item = &'a Trip>,
    config: &EconomicsConfig,
) -> UtilizationReport {
    let mut per_vehicle: BTreeMap<&'a str, Usage> = BTreeMap::new();
    let mut per_weekday: BTreeMap<(&'a str, u32), (Weekday, Usage)> = BTreeMap::new();
    let mut counted = 0_u64;
    let mut without_vehicle = 0_u64;

    let selected = trips
        .into_iter()
        .filter(|t| config.year.is_none_or(|y| t.year() == Some(y)));

    for trip in selected {
        let Some(vehicle) = trip.vehicle_id.as_deref() else {
            without_vehicle += 1;
            continue;
        };
        counted += 1;
        let minutes = ride_minutes(trip);
        per_vehicle.entry(vehicle).or_default().add(trip, minutes);

        if let Some(calendar) = trip.calendar.as_ref() {
            let weekday = calendar.day_of_week;
            per_weekday
                .entry((vehicle, weekday.num_days_from_monday()))
                .or_insert_with(|| (weekday, Usage::default()))
                .1
                .add(trip, minutes);
        }
    }

    if without_vehicle > 0 {
        log::warn!("{without_vehicle} trips have no bike id and were left out of utilization");
    }

    let vehicles: Vec<VehicleUtilization> = per_vehicle
        .iter()
        .map(|(id, usage)| VehicleUtilization {
            vehicle_id: (*id).to_string(),
            trips: usage.trips,
            ride_minutes: usage.ride_minutes,
            first_start: usage.first_start,
            last_stop: usage.last_stop,
            active_minutes: usage.active_minutes(),
            utilization_pct: usage.utilization_pct(),
            revenue: usage.ride_minutes * config.rate_per_minute,
        })
        .collect();

    let vehicle_weekdays: Vec<VehicleWeekdayUtilization> = per_weekday
        .iter()
        .map(|((id, _), (weekday, usage))| VehicleWeekdayUtilization {
            vehicle_id: (*id).to_string(),
            weekday: *weekday,
            ride_minutes: usage.ride_minutes,
            active_minutes: usage.active_minutes(),
            utilization_pct: usage.utilization_pct(),
        })
        .collect();

    let summary = summarize(config, counted, without_vehicle, &vehicles, &vehicle_weekdays);

    log::info!(
        "Utilization over {} bicycles: revenue ${:.2}, cost ${:.2}, margin ${:.2}",
        summary.fleet_size,
        summary.total_revenue,
        summary.total_cost,
        summary.margin,
    );

    UtilizationReport {
        vehicles,
        vehicle_weekdays,
        summary,
    }
}

#[allow(clippy::cast_precision_loss)]
fn summarize(
    config: &EconomicsConfig,
    trips: u64,
    trips_without_vehicle: u64,
    vehicles: &[VehicleUtilization],
    vehicle_weekdays: &[VehicleWeekdayUtilization],
) -> FleetSummary {
    let utilizations: Vec<f64> = vehicles.iter().filter_map(|v| v.utilization_pct).collect();

    let mut weekday_values: BTreeMap<u32, (Weekday, Vec<f64>)> = BTreeMap::new();
    for row in vehicle_weekdays {
        if let Some(pct) = row.utilization_pct {
            weekday_values
                .entry(row.weekday.num_days_from_monday())
                .or_insert_with(|| (row.weekday, Vec::new()))
                .1
                .push(pct);
        }
    }
    let by_weekday = weekday_values
        .into_values()
        .filter_map(|(weekday, values)| {
            let dist = Distribution::of(&values)?;
            Some(WeekdayUtilization {
                weekday,
                vehicles: values.len() as u64,
                mean_pct: dist.mean,
                median_pct: dist.median,
            })
        })
        .collect();

    let fleet_size = vehicles.len() as u64;
    let total_revenue: f64 = vehicles.iter().map(|v| v.revenue).sum();
    let cost_per_bike = config.costs.per_bike();
    let total_cost = fleet_size as f64 * cost_per_bike;

    FleetSummary {
        year: config.year,
        trips,
        trips_without_vehicle,
        fleet_size,
        vehicles_with_utilization: utilizations.len() as u64,
        total_ride_minutes: vehicles.iter().map(|v| v.ride_minutes).sum(),
        utilization: Distribution::of(&utilizations),
        total_revenue,
        cost_per_bike,
        total_cost,
        margin: total_revenue - total_cost,
        by_weekday,
    }
}
