//! Per-sector series prepared for charting.

use anyhow::{anyhow, Result};

use super::statistics::mean;
use crate::config::{Config, VisualizationConfig};
use crate::processing::{History, SECTORS};

/// A roster driver with data in every sector, and their team colour.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartedDriver {
    pub code: String,
    pub color: String,
}

/// One driver's times for one sector, ready to plot.
#[derive(Clone, Debug, PartialEq)]
pub struct SectorSeries {
    pub code: String,
    pub color: String,
    pub values: Vec<f64>,
}

impl SectorSeries {
    /// Average time, or `None` when no lap survived filtering.
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(mean(&self.values))
        }
    }

    /// Legend label: `HAM (avg. 31.25)`.
    pub fn label(&self) -> String {
        match self.average() {
            Some(avg) => format!("{} (avg. {:.2})", self.code, avg),
            None => format!("{} (avg. n/a)", self.code),
        }
    }
}

/// Roster drivers present in the history with all sectors recorded, in
/// roster order.
pub fn charted_drivers(config: &Config, history: &History) -> Result<Vec<ChartedDriver>> {
    let colors = config.team_colors();
    config
        .drivers
        .iter()
        .filter(|d| history.sectors_recorded(&d.name) == SECTORS.len())
        .map(|d| {
            let color = colors
                .get(&d.team)
                .ok_or_else(|| anyhow!("No colour configured for team {} ({})", d.team, d.name))?;
            Ok(ChartedDriver {
                code: d.name.clone(),
                color: color.clone(),
            })
        })
        .collect()
}

/// Collapses runs of the same time into one lap.
pub fn group_laps(values: &[f64]) -> Vec<f64> {
    let mut grouped = values.to_vec();
    grouped.dedup();
    grouped
}

/// Builds the series of every non-excluded driver for `sector`.
///
/// Times outside `[min_times, max_times]` for the sector are dropped after
/// grouping; this also removes the zero placeholders.
pub fn sector_series(
    history: &History,
    drivers: &[ChartedDriver],
    sector: u8,
    group: bool,
    viz: &VisualizationConfig,
) -> Vec<SectorSeries> {
    let idx = sector as usize - 1;
    let (min, max) = (viz.min_times[idx], viz.max_times[idx]);

    drivers
        .iter()
        .filter(|d| !viz.excluded_drivers.contains(&d.code))
        .map(|d| {
            let raw = history.series(&d.code, sector);
            let laps = if group { group_laps(raw) } else { raw.to_vec() };
            SectorSeries {
                code: d.code.clone(),
                color: d.color.clone(),
                values: laps.into_iter().filter(|t| (min..=max).contains(t)).collect(),
            }
        })
        .collect()
}
