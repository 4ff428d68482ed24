//! Summary statistics over utilization percentages.

use serde::{Deserialize, Serialize};

/// Mean, median and range of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    /// Number of values.
    pub count: u64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median; the mean of the two middle values for an even count.
    pub median: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl Distribution {
    /// Summarizes `values`, or `None` if there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let median = if n % 2 == 0 {
            f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
        } else {
            sorted[n / 2]
        };

        Some(Self {
            count: n as u64,
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
            min: sorted[0],
            max: sorted[n - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_and_even_medians() {
        let odd = Distribution::of(&[3.0, 1.0, 2.0]).unwrap();
        assert!((odd.median - 2.0).abs() < f64::EPSILON);
        let even = Distribution::of(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((even.median - 2.5).abs() < f64::EPSILON);
        assert!((even.mean - 2.5).abs() < f64::EPSILON);
        assert!((even.min - 1.0).abs() < f64::EPSILON);
        assert!((even.max - 4.0).abs() < f64::EPSILON);
        assert_eq!(even.count, 4);
    }

    #[test]
    fn empty_has_no_distribution() {
        assert!(Distribution::of(&[]).is_none());
    }
}
