//! Statistics calculation and chart visualization.
//!
//! This module provides:
//! - Series preparation from the sector history (lap grouping, range filter)
//! - Statistics calculation (mean, median, std_dev, quartiles, KDE)
//! - Per-sector comparison and distribution charts
//! - JSON export of statistics

pub mod charts;
pub mod export;
pub mod palette;
pub mod series;
pub mod statistics;

pub use series::{ChartedDriver, SectorSeries};
pub use statistics::StatisticsReport;

use anyhow::{anyhow, Result};
use log::{info, warn};
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::paths::{sector_data_path, statistics_path};
use crate::processing::{History, SECTORS};

/// Checks a comparison request against the charted drivers.
fn validate_comparison(compare: &[String], drivers: &[ChartedDriver]) -> Result<()> {
    let unknown: Vec<&str> = compare
        .iter()
        .filter(|c| !drivers.iter().any(|d| &d.code == *c))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(anyhow!(
            "Drivers without data in every sector: {}",
            unknown.join(", ")
        ));
    }
    if compare.len() < 2 {
        return Err(anyhow!("Provide at least 2 drivers to compare"));
    }
    Ok(())
}

/// Draws `output/COMPARISON_S<n>.png` for each sector.
pub fn plot_driver_comparisons<R: Rng + ?Sized>(
    compare: &[String],
    history: &History,
    drivers: &[ChartedDriver],
    config: &Config,
    output: &Path,
    rng: &mut R,
) -> Result<Vec<PathBuf>> {
    validate_comparison(compare, drivers)?;

    let viz = &config.race_visualization;
    for code in compare.iter().filter(|c| viz.excluded_drivers.contains(*c)) {
        warn!("{} is excluded from visualization and won't be compared", code);
    }

    let selected: Vec<&ChartedDriver> = compare
        .iter()
        .filter_map(|c| drivers.iter().find(|d| &d.code == c))
        .filter(|d| !viz.excluded_drivers.contains(&d.code))
        .collect();
    let colors: Vec<String> = selected.iter().map(|d| d.color.clone()).collect();
    let palette = palette::comparison_palette(&colors, rng)?;
    let recolored: Vec<ChartedDriver> = selected
        .iter()
        .zip(palette)
        .map(|(d, color)| ChartedDriver {
            code: d.code.clone(),
            color,
        })
        .collect();

    let mut paths = Vec::with_capacity(SECTORS.len());
    for sector in SECTORS {
        let series = series::sector_series(history, &recolored, sector, true, viz);
        let path = output.join(format!("COMPARISON_S{}.png", sector));
        charts::plot_comparison(&series, sector, &path)?;
        paths.push(path);
    }
    Ok(paths)
}

/// Draws `output/DISTRIBUTION_S<n>.png` for each sector.
pub fn plot_sector_distributions(
    history: &History,
    drivers: &[ChartedDriver],
    config: &Config,
    output: &Path,
) -> Result<Vec<PathBuf>> {
    let viz = &config.race_visualization;
    let mut paths = Vec::with_capacity(SECTORS.len());
    for sector in SECTORS {
        let series = series::sector_series(history, drivers, sector, true, viz);
        let path = output.join(format!("DISTRIBUTION_S{}.png", sector));
        let offset = viz.distribution_offset[sector as usize - 1];
        charts::plot_distribution(&series, sector, offset, &path)?;
        paths.push(path);
    }
    Ok(paths)
}

/// Per-driver statistics over the grouped, filtered laps of every sector.
pub fn build_statistics(history: &History, drivers: &[ChartedDriver], config: &Config) -> StatisticsReport {
    let per_sector: Vec<(u8, Vec<SectorSeries>)> = SECTORS
        .iter()
        .map(|&sector| {
            let series = series::sector_series(history, drivers, sector, true, &config.race_visualization);
            (sector, series)
        })
        .collect();

    StatisticsReport::from_series(
        per_sector
            .iter()
            .flat_map(|(sector, series)| series.iter().map(move |s| (*sector, s))),
    )
}

/// Runs the full visualization: load history, draw charts, export JSON.
///
/// Returns every file written. Comparisons are drawn only when `compare`
/// is non-empty.
pub fn visualize<R: Rng + ?Sized>(
    config: &Config,
    output: &Path,
    compare: &[String],
    rng: &mut R,
) -> Result<Vec<PathBuf>> {
    let history = History::load(&sector_data_path(output))?;
    let drivers = series::charted_drivers(config, &history)?;
    if drivers.is_empty() {
        return Err(anyhow!("No roster driver has times in every sector"));
    }
    info!("Visualizing {} drivers", drivers.len());

    let mut written = Vec::new();
    if !compare.is_empty() {
        written.extend(plot_driver_comparisons(compare, &history, &drivers, config, output, rng)?);
    }
    written.extend(plot_sector_distributions(&history, &drivers, config, output)?);
    info!("Generated {} charts", written.len());

    let report = build_statistics(&history, &drivers, config);
    let json_path = statistics_path(output);
    export::export_to_json(&report, &json_path)?;
    info!("Statistics JSON saved: {}", json_path.display());
    written.push(json_path);

    Ok(written)
}
