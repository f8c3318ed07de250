//! Fixed-geometry splitting of the preprocessed overlay crops.
//!
//! The timing overlay is a grid: one row per grid position, and three
//! sector columns in the sector crop. Row height and column width are
//! measured at 720p and scaled by both the resize scale and the recording
//! resolution.

use image::{imageops, GrayImage};
use thiserror::Error;

use crate::config::Config;

/// Row height of one grid position at 720p, in pixels.
const ROW_HEIGHT_720: f64 = 21.0;

/// Width of one sector column at 720p, in pixels.
const SECTOR_WIDTH_720: f64 = 70.0;

/// Sector columns per row.
pub const SECTORS_PER_ROW: usize = 3;

/// The crop doesn't fit the configured grid. Processing must stop rather
/// than pair drivers with the wrong rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("driver image split into {actual} rows, expected {expected}")]
    DriverCount { expected: usize, actual: usize },
    #[error("sector image split into {actual} cells, expected {expected}")]
    SectorCount { expected: usize, actual: usize },
    #[error("resize scale {0} yields an empty grid cell")]
    EmptyCell(u32),
}

/// Grid layout derived from the configuration.
#[derive(Clone, Copy, Debug)]
pub struct GridGeometry {
    pub drivers_on_grid: usize,
    pub res_mul: f64,
}

impl GridGeometry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            drivers_on_grid: config.race_processing.drivers_on_grid,
            res_mul: config.res_mul(),
        }
    }

    pub fn row_height(&self, resize_scale: u32) -> u32 {
        (ROW_HEIGHT_720 * resize_scale as f64 * self.res_mul).floor() as u32
    }

    pub fn sector_width(&self, resize_scale: u32) -> u32 {
        (SECTOR_WIDTH_720 * resize_scale as f64 * self.res_mul).floor() as u32
    }

    /// Vertical bands as (y, height). The last grid row runs to the bottom.
    fn bands(&self, image_height: u32, resize_scale: u32) -> Result<Vec<(u32, u32)>, SplitError> {
        let row_height = self.row_height(resize_scale);
        if row_height == 0 {
            return Err(SplitError::EmptyCell(resize_scale));
        }

        let count = image_height.div_ceil(row_height) as usize;
        Ok((0..count)
            .map(|idx| {
                let y = idx as u32 * row_height;
                let remaining = image_height - y;
                let height = if idx == self.drivers_on_grid.saturating_sub(1) {
                    remaining
                } else {
                    row_height.min(remaining)
                };
                (y, height)
            })
            .collect())
    }
}

/// Splits the driver crop into one band per grid position.
pub fn split_drivers(
    img: &GrayImage,
    resize_scale: u32,
    geometry: &GridGeometry,
) -> Result<Vec<GrayImage>, SplitError> {
    let bands = geometry.bands(img.height(), resize_scale)?;
    if bands.len() != geometry.drivers_on_grid {
        return Err(SplitError::DriverCount {
            expected: geometry.drivers_on_grid,
            actual: bands.len(),
        });
    }

    Ok(bands
        .into_iter()
        .map(|(y, height)| imageops::crop_imm(img, 0, y, img.width(), height).to_image())
        .collect())
}

/// Splits the sector crop into three cells per grid position.
///
/// Cells are returned driver by driver: `[d0s1, d0s2, d0s3, d1s1, ...]`.
pub fn split_sectors(
    img: &GrayImage,
    resize_scale: u32,
    geometry: &GridGeometry,
) -> Result<Vec<GrayImage>, SplitError> {
    let column_width = geometry.sector_width(resize_scale);
    if column_width == 0 {
        return Err(SplitError::EmptyCell(resize_scale));
    }
    let bands = geometry.bands(img.height(), resize_scale)?;

    // Column-major first: every sector 1 cell, then sector 2, then sector 3.
    let mut by_column = Vec::with_capacity(bands.len() * SECTORS_PER_ROW);
    for sector_idx in 0..SECTORS_PER_ROW as u32 {
        let x = sector_idx * column_width;
        let width = column_width.min(img.width().saturating_sub(x));
        for &(y, height) in &bands {
            by_column.push(imageops::crop_imm(img, x, y, width, height).to_image());
        }
    }

    let expected = geometry.drivers_on_grid * SECTORS_PER_ROW;
    if by_column.len() != expected {
        return Err(SplitError::SectorCount {
            expected,
            actual: by_column.len(),
        });
    }

    let rows = geometry.drivers_on_grid;
    let mut slots: Vec<Option<GrayImage>> = by_column.into_iter().map(Some).collect();
    let mut by_driver = Vec::with_capacity(expected);
    for driver_idx in 0..rows {
        for sector_idx in 0..SECTORS_PER_ROW {
            if let Some(cell) = slots[sector_idx * rows + driver_idx].take() {
                by_driver.push(cell);
            }
        }
    }

    Ok(by_driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn geometry(drivers_on_grid: usize) -> GridGeometry {
        GridGeometry {
            drivers_on_grid,
            res_mul: 1.0,
        }
    }

    /// Rows are tagged with their grid position, columns with their sector.
    fn tagged_grid(rows: u32, row_height: u32, col_width: u32) -> GrayImage {
        GrayImage::from_fn(col_width * 3, rows * row_height, |x, y| {
            Luma([((y / row_height) * 10 + x / col_width) as u8])
        })
    }

    #[test]
    fn test_geometry_scales_with_resolution() {
        let geo = GridGeometry {
            drivers_on_grid: 20,
            res_mul: 1.5,
        };
        assert_eq!(geo.row_height(4), 126);
        assert_eq!(geo.sector_width(4), 420);
    }

    #[test]
    fn test_split_drivers_one_band_per_row() {
        let img = GrayImage::new(42, 21 * 20);
        let bands = split_drivers(&img, 1, &geometry(20)).unwrap();

        assert_eq!(bands.len(), 20);
        assert!(bands.iter().all(|b| b.dimensions() == (42, 21)));
    }

    #[test]
    fn test_last_band_takes_remainder() {
        let img = GrayImage::new(42, 21 * 20 - 5);
        let bands = split_drivers(&img, 1, &geometry(20)).unwrap();

        assert_eq!(bands.len(), 20);
        assert_eq!(bands[19].height(), 16);
    }

    #[test]
    fn test_split_drivers_wrong_count_is_fatal() {
        let img = GrayImage::new(42, 21 * 18);
        let err = split_drivers(&img, 1, &geometry(20)).unwrap_err();
        assert_eq!(
            err,
            SplitError::DriverCount {
                expected: 20,
                actual: 18
            }
        );
    }

    #[test]
    fn test_split_sectors_row_major_order() {
        let img = tagged_grid(4, 21, 70);
        let cells = split_sectors(&img, 1, &geometry(4)).unwrap();

        assert_eq!(cells.len(), 12);
        for driver in 0..4u8 {
            for sector in 0..3u8 {
                let cell = &cells[(driver * 3 + sector) as usize];
                assert_eq!(cell.dimensions(), (70, 21));
                assert_eq!(cell.get_pixel(0, 0)[0], driver * 10 + sector);
            }
        }
    }

    #[test]
    fn test_split_sectors_clamps_narrow_image() {
        // Third column is cut short, as with the real overlay crop.
        let img = GrayImage::new(199, 21 * 2);
        let cells = split_sectors(&img, 1, &geometry(2)).unwrap();
        assert_eq!(cells[2].width(), 59);
        assert_eq!(cells[0].width(), 70);
    }

    #[test]
    fn test_split_sectors_wrong_count_is_fatal() {
        let img = GrayImage::new(210, 21 * 3);
        let err = split_sectors(&img, 1, &geometry(2)).unwrap_err();
        assert_eq!(
            err,
            SplitError::SectorCount {
                expected: 6,
                actual: 9
            }
        );
    }

    #[test]
    fn test_split_is_deterministic() {
        let img = tagged_grid(5, 84, 280);
        let first = split_sectors(&img, 4, &geometry(5)).unwrap();
        let second = split_sectors(&img, 4, &geometry(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_scale_is_rejected() {
        let img = GrayImage::new(42, 42);
        assert_eq!(
            split_drivers(&img, 0, &geometry(2)).unwrap_err(),
            SplitError::EmptyCell(0)
        );
    }
}
