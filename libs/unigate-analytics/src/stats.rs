//! Descriptive statistics and trend classification
//!
//! Pure functions over numeric slices; the engine handles series access and
//! payload coercion.

use serde::{Deserialize, Serialize};

/// Slope magnitude below which a fitted line counts as flat
pub const SLOPE_THRESHOLD: f64 = 0.1;

/// Qualitative direction of a series window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// Statistics for one analyzed series window.
///
/// When no record in the window coerces to a number, only `count` and
/// `time_span_ms` are populated; this is a degraded result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStat {
    pub count: usize,
    pub time_span_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Ordinary least-squares slope of `y = a + b*x` with x = 0..n-1.
/// Returns 0.0 for fewer than two points (no direction to fit).
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let sum_x = (0..values.len()).map(|i| i as f64).sum::<f64>();
    let sum_y = values.iter().sum::<f64>();
    let sum_xy = values
        .iter()
        .enumerate()
        .map(|(i, y)| i as f64 * y)
        .sum::<f64>();
    let sum_x2 = (0..values.len()).map(|i| (i as f64).powi(2)).sum::<f64>();

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

/// Classify the trend of a window of numeric values.
///
/// A window of identical values is stable by definition; the fit is skipped
/// for it (degenerate slope).
pub fn classify_trend(values: &[f64]) -> Trend {
    if values.is_empty() || values.iter().all(|v| *v == values[0]) {
        return Trend::Stable;
    }
    let slope = ols_slope(values);
    if slope > SLOPE_THRESHOLD {
        Trend::Increasing
    } else if slope < -SLOPE_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_ols_slope_monotonic_series() {
        let values = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert!((ols_slope(&values) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ols_slope_single_point_is_flat() {
        assert_eq!(ols_slope(&[42.0]), 0.0);
    }

    #[test]
    fn test_classify_increasing() {
        assert_eq!(classify_trend(&[10.0, 11.0, 12.0, 13.0, 14.0]), Trend::Increasing);
    }

    #[test]
    fn test_classify_decreasing() {
        assert_eq!(classify_trend(&[14.0, 13.0, 12.0, 11.0, 10.0]), Trend::Decreasing);
    }

    #[test]
    fn test_classify_constant_series_stable_without_fit() {
        assert_eq!(classify_trend(&[5.0, 5.0, 5.0, 5.0, 5.0]), Trend::Stable);
    }

    #[test]
    fn test_classify_small_slope_is_stable() {
        // Slope 0.05, below the 0.1 threshold
        assert_eq!(classify_trend(&[1.0, 1.05, 1.1, 1.15, 1.2]), Trend::Stable);
    }

    #[test]
    fn test_trend_display() {
        assert_eq!(Trend::Increasing.to_string(), "increasing");
        assert_eq!(Trend::Stable.to_string(), "stable");
    }
}
