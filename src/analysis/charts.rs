//! Chart generation using plotters.
//!
//! Two chart kinds per sector: a lap-by-lap line comparison of selected
//! drivers, and a ridge plot of every driver's time distribution.

use super::palette::parse_hex_color;
use super::series::SectorSeries;
use super::statistics::gaussian_kde;
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

const COMPARISON_SIZE: (u32, u32) = (1200, 700);

const DISTRIBUTION_WIDTH: u32 = 1200;
const DISTRIBUTION_TITLE_HEIGHT: u32 = 60;
const DISTRIBUTION_ROW_HEIGHT: u32 = 40;
const DISTRIBUTION_AXIS_HEIGHT: u32 = 60;

/// Bandwidth multiplier for the distribution curves.
pub const KDE_BW_ADJUST: f64 = 0.3;

/// Ridge height in rows; above 1 the curves overlap the row above.
const RIDGE_HEIGHT: f64 = 1.25;

/// Points sampled along the x axis for each density curve.
const KDE_POINTS: usize = 400;

/// Min and max over every value in `series`, padded by 5%.
fn value_range(series: &[&SectorSeries]) -> Option<(f64, f64)> {
    let values = series.iter().flat_map(|s| s.values.iter().copied());
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() {
        return None;
    }
    let pad = ((max - min) * 0.05).max(0.1);
    Some((min - pad, max + pad))
}

/// Draws one line per driver, lap index on x, time on y.
pub fn plot_comparison(series: &[SectorSeries], sector: u8, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, COMPARISON_SIZE).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill chart background")?;

    let refs: Vec<&SectorSeries> = series.iter().collect();
    let (y_min, y_max) = value_range(&refs).unwrap_or((0.0, 1.0));
    let laps = series.iter().map(|s| s.values.len()).max().unwrap_or(0).max(2);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Sector {}", sector), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0f64..(laps - 1) as f64, y_min..y_max)
        .context("Failed to build comparison chart")?;

    chart
        .configure_mesh()
        .x_desc("Lap")
        .y_desc("Time (s)")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_label_formatter(&|y| format!("{:.1}", y))
        .draw()
        .context("Failed to draw mesh")?;

    for s in series {
        let color = parse_hex_color(&s.color)?;
        chart
            .draw_series(LineSeries::new(
                s.values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                color.stroke_width(2),
            ))?
            .label(s.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .context("Failed to draw legend")?;

    root.present().context("Failed to save comparison chart")?;
    Ok(())
}

/// Draws stacked density curves, fastest average at the top.
///
/// `x_start` is the left edge of the time axis. Series without laps are
/// left out.
pub fn plot_distribution(
    series: &[SectorSeries],
    sector: u8,
    x_start: f64,
    output_path: &Path,
) -> Result<()> {
    let mut rows: Vec<&SectorSeries> = series.iter().filter(|s| !s.values.is_empty()).collect();
    rows.sort_by(|a, b| {
        let (a, b) = (a.average().unwrap_or(f64::MAX), b.average().unwrap_or(f64::MAX));
        a.total_cmp(&b)
    });

    let height = DISTRIBUTION_TITLE_HEIGHT
        + DISTRIBUTION_ROW_HEIGHT * rows.len().max(1) as u32
        + DISTRIBUTION_AXIS_HEIGHT;
    let root = BitMapBackend::new(output_path, (DISTRIBUTION_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill chart background")?;

    let (data_min, x_max) = value_range(&rows).unwrap_or((x_start, x_start + 1.0));
    let x_min = x_start.min(data_min);
    let n_rows = rows.len() as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Sector {}", sector),
            ("sans-serif", 24).into_font().style(FontStyle::Bold),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(10)
        .build_cartesian_2d(x_min..x_max, 0.0f64..(n_rows + RIDGE_HEIGHT).max(1.0))
        .context("Failed to build distribution chart")?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_desc("Time (s)")
        .x_label_formatter(&|x| format!("{:.1}", x))
        .draw()
        .context("Failed to draw mesh")?;

    let step = (x_max - x_min) / (KDE_POINTS - 1) as f64;
    let xs: Vec<f64> = (0..KDE_POINTS).map(|i| x_min + i as f64 * step).collect();
    let curves: Vec<Vec<f64>> = rows
        .iter()
        .map(|s| gaussian_kde(&s.values, KDE_BW_ADJUST, &xs))
        .collect();
    let peak = curves
        .iter()
        .flatten()
        .copied()
        .fold(0.0f64, f64::max)
        .max(f64::MIN_POSITIVE);

    // Top row first so lower ridges are drawn over it.
    for (idx, (s, density)) in rows.iter().zip(&curves).enumerate() {
        let color = parse_hex_color(&s.color)?;
        let baseline = n_rows - 1.0 - idx as f64;
        let ridge: Vec<(f64, f64)> = xs
            .iter()
            .zip(density)
            .map(|(&x, &d)| (x, baseline + d / peak * RIDGE_HEIGHT))
            .collect();

        chart.draw_series(AreaSeries::new(ridge.iter().copied(), baseline, color.filled()))?;
        chart.draw_series(LineSeries::new(ridge, WHITE.stroke_width(2)))?;
        chart.draw_series(LineSeries::new(
            vec![(x_min, baseline), (x_max, baseline)],
            color.stroke_width(2),
        ))?;
        chart.draw_series(std::iter::once(Text::new(
            s.label(),
            (x_min, baseline + 0.3),
            ("sans-serif", 14).into_font().style(FontStyle::Bold).color(&color),
        )))?;
    }

    root.present().context("Failed to save distribution chart")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> SectorSeries {
        SectorSeries {
            code: "HAM".to_string(),
            color: "#112233".to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_value_range_padded() {
        let a = series(&[30.0, 32.0]);
        let b = series(&[31.0, 34.0]);
        let (min, max) = value_range(&[&a, &b]).unwrap();
        assert!((min - 29.8).abs() < 1e-9);
        assert!((max - 34.2).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_empty() {
        let empty = series(&[]);
        assert!(value_range(&[&empty]).is_none());
        assert!(value_range(&[]).is_none());

        // A single time still gets a visible range.
        let single = series(&[30.0]);
        let (min, max) = value_range(&[&single]).unwrap();
        assert!(min < 30.0 && max > 30.0);
    }
}
