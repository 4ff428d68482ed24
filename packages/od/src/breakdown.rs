//! Exploratory trip counts.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Weekday;
use ward_flow_od_models::{Breakdown, WeekdayCount, YearAgeGroupCount, YearGenderCount};
use ward_flow_trip_models::{AgeGroup, Gender, Trip};

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Tallies cleaned trips by calendar and rider attributes.
pub fn breakdown<'a>(trips: impl IntoIterator<Item = &'a Trip>) -> Breakdown {
    let mut out = Breakdown::default();
    let mut weekdays = [0_u64; 7];
    let mut year_gender: BTreeMap<(i32, Gender), u64> = BTreeMap::new();
    let mut year_age: BTreeMap<(i32, AgeGroup), u64> = BTreeMap::new();
    let mut vehicles: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();

    for trip in trips {
        out.total += 1;

        if let Some(group) = trip.age_group {
            *out.by_age_group.entry(group).or_insert(0) += 1;
        }

        let Some(calendar) = trip.calendar.as_ref() else {
            continue;
        };
        let year = calendar.year;

        *out.by_year.entry(year).or_insert(0) += 1;
        *out.by_month.entry(calendar.month).or_insert(0) += 1;
        *out.by_season.entry(calendar.season).or_insert(0) += 1;
        weekdays[calendar.day_of_week.num_days_from_monday() as usize] += 1;

        if let Some(gender) = trip.rider_gender {
            *year_gender.entry((year, gender)).or_insert(0) += 1;
        }
        if let Some(group) = trip.age_group {
            *year_age.entry((year, group)).or_insert(0) += 1;
        }
        if let Some(vehicle) = trip.vehicle_id.as_deref() {
            vehicles.entry(year).or_default().insert(vehicle);
        }
    }

    out.by_weekday = WEEK
        .iter()
        .zip(weekdays)
        .filter(|(_, trips)| *trips > 0)
        .map(|(&weekday, trips)| WeekdayCount { weekday, trips })
        .collect();
    out.by_year_gender = year_gender
        .into_iter()
        .map(|((year, gender), trips)| YearGenderCount {
            year,
            gender,
            trips,
        })
        .collect();
    out.by_year_age_group = year_age
        .into_iter()
        .map(|((year, age_group), trips)| YearAgeGroupCount {
            year,
            age_group,
            trips,
        })
        .collect();
    out.vehicles_by_year = vehicles
        .into_iter()
        .map(|(year, set)| (year, set.len() as u64))
        .collect();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::trip;
    use ward_flow_trip_models::Season;

    #[test]
    fn counts_calendar_and_rider_dimensions() {
        let mut a = trip("a", Some(2016), 9, Some(25));
        a.rider_gender = Some(Gender::Female);
        a.vehicle_id = Some("100".to_string());
        let mut b = trip("b", Some(2016), 18, Some(45));
        b.rider_gender = Some(Gender::Male);
        b.vehicle_id = Some("100".to_string());
        let mut c = trip("c", Some(2017), 9, None);
        c.vehicle_id = Some("200".to_string());
        let d = trip("d", None, 0, Some(30));

        let result = breakdown([&a, &b, &c, &d]);

        assert_eq!(result.total, 4);
        assert_eq!(result.by_year.get(&2016), Some(&2));
        assert_eq!(result.by_year.get(&2017), Some(&1));
        assert_eq!(result.by_season.get(&Season::Summer), Some(&3));
        assert_eq!(result.by_age_group.get(&AgeGroup::From19To30), Some(&2));
        assert_eq!(result.by_age_group.get(&AgeGroup::From41To50), Some(&1));
        assert_eq!(result.by_year_gender.len(), 2);
        assert_eq!(result.vehicles_by_year.get(&2016), Some(&1));
        assert_eq!(result.vehicles_by_year.get(&2017), Some(&1));
        let weekday_total: u64 = result.by_weekday.iter().map(|w| w.trips).sum();
        assert_eq!(weekday_total, 3, "trips without timestamps have no weekday");
    }

    #[test]
    fn empty_input_gives_empty_breakdown() {
        assert_eq!(breakdown(std::iter::empty()), Breakdown::default());
    }
}
