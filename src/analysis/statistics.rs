//! Statistics calculation for sector times.
//!
//! Calculates mean, median, min, max, standard deviation and quartiles per
//! driver per sector, plus the Gaussian kernel density estimate used by the
//! distribution charts.

use serde::Serialize;

use super::series::SectorSeries;

/// Statistics for one driver in one sector.
#[derive(Debug, Clone, Serialize)]
pub struct SectorStats {
    /// Driver code
    pub driver: String,
    /// Sector number (1, 2, or 3)
    pub sector: u8,
    /// Number of laps
    pub count: usize,
    /// Arithmetic mean (average)
    pub mean: f64,
    /// Median (middle value)
    pub median: f64,
    /// Fastest time
    pub min: f64,
    /// Slowest time
    pub max: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    /// First quartile (25th percentile)
    pub quartile_1: f64,
    /// Third quartile (75th percentile)
    pub quartile_3: f64,
}

/// Statistics for every charted driver.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    /// Number of drivers with at least one lap
    pub drivers: usize,
    pub sectors: Vec<SectorStats>,
}

impl StatisticsReport {
    /// Builds the report from the series of all three sectors. Series
    /// without laps are left out.
    pub fn from_series<'a>(series: impl IntoIterator<Item = (u8, &'a SectorSeries)>) -> Self {
        let sectors: Vec<SectorStats> = series
            .into_iter()
            .filter(|(_, s)| !s.values.is_empty())
            .map(|(sector, s)| calculate_sector_stats(&s.values, &s.code, sector))
            .collect();

        let mut drivers: Vec<&str> = sectors.iter().map(|s| s.driver.as_str()).collect();
        drivers.sort_unstable();
        drivers.dedup();

        StatisticsReport {
            drivers: drivers.len(),
            sectors,
        }
    }
}

/// Calculate statistics for a single series of times.
pub fn calculate_sector_stats(values: &[f64], driver: &str, sector: u8) -> SectorStats {
    if values.is_empty() {
        return SectorStats {
            driver: driver.to_string(),
            sector,
            count: 0,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
            std_dev: 0.0,
            quartile_1: 0.0,
            quartile_3: 0.0,
        };
    }

    let count = values.len();

    // Sort for median, quartiles, min, max
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = mean(values);

    SectorStats {
        driver: driver.to_string(),
        sector,
        count,
        mean,
        median: calculate_median(&sorted),
        min: sorted[0],
        max: sorted[count - 1],
        std_dev: sample_std_dev(values),
        quartile_1: calculate_percentile(&sorted, 25.0),
        quartile_3: calculate_percentile(&sorted, 75.0),
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate median from sorted values.
fn calculate_median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        let mid = n / 2;
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Calculate percentile using linear interpolation.
fn calculate_percentile(sorted: &[f64], percentile: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }

    // Index in range [0, n-1]
    let index = (percentile / 100.0) * (n - 1) as f64;
    let lower_idx = index.floor() as usize;
    let upper_idx = index.ceil() as usize;

    if lower_idx == upper_idx {
        sorted[lower_idx]
    } else {
        let lower = sorted[lower_idx];
        let upper = sorted[upper_idx];
        lower + (upper - lower) * index.fract()
    }
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Gaussian KDE bandwidth by Scott's rule, scaled by `adjust`.
pub fn scott_bandwidth(values: &[f64], adjust: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let factor = (values.len() as f64).powf(-0.2);
    factor * sample_std_dev(values) * adjust
}

/// Gaussian kernel density of `values` evaluated at each of `xs`.
///
/// Returns all zeros when the bandwidth collapses (fewer than two distinct
/// values).
pub fn gaussian_kde(values: &[f64], adjust: f64, xs: &[f64]) -> Vec<f64> {
    let h = scott_bandwidth(values, adjust);
    if h <= 0.0 || !h.is_finite() {
        return vec![0.0; xs.len()];
    }

    let norm = 1.0 / (values.len() as f64 * h * (2.0 * std::f64::consts::PI).sqrt());
    xs.iter()
        .map(|&x| {
            values
                .iter()
                .map(|&v| (-0.5 * ((x - v) / h).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}
