//! The processing pass: screenshot pairs in, sector history out.
//!
//! - `roster`: driver code resolution with bounded retries
//! - `reconcile`: per-frame filtering and merging
//! - `history`: the accumulated series and its JSON file

pub mod history;
pub mod reconcile;
pub mod roster;

pub use history::{History, SectorReading, SECTORS};
pub use reconcile::{FrameOutcome, Reconciler};
pub use roster::resolve_drivers;

use anyhow::{Context, Result};
use image::DynamicImage;
use log::{info, warn};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::ocr::extract::{parse_sector_time, read_sector_values};
use crate::ocr::split::SECTORS_PER_ROW;
use crate::ocr::{preprocess_image, split_sectors, GridGeometry, OcrEngine};
use crate::paths::{drivers_dir, sectors_dir};

/// The two crops saved for one captured frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenshotPair {
    pub index: u64,
    pub drivers: PathBuf,
    pub sectors: PathBuf,
}

/// PNG files in `dir` keyed by the numeric capture index in their stem,
/// sorted by that index.
fn indexed_pngs(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        match path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(index) => files.push((index, path)),
            None => warn!("Ignoring screenshot without a capture index: {}", path.display()),
        }
    }

    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

/// Lists the driver/sector screenshot pairs under `screenshots`, in capture
/// order.
pub fn list_screenshot_pairs(screenshots: &Path) -> Result<Vec<ScreenshotPair>> {
    let drivers = indexed_pngs(&drivers_dir(screenshots))?;
    let sectors = indexed_pngs(&sectors_dir(screenshots))?;

    if drivers.len() != sectors.len() {
        warn!(
            "{} driver screenshots but {} sector screenshots, using the first {}",
            drivers.len(),
            sectors.len(),
            drivers.len().min(sectors.len())
        );
    }

    Ok(drivers
        .into_iter()
        .zip(sectors)
        .map(|((index, drivers), (_, sectors))| ScreenshotPair {
            index,
            drivers,
            sectors,
        })
        .collect())
}

/// Reads one sector crop into a reading per grid position.
///
/// Cells that fail to parse become 0 with a warning naming `source`.
pub fn parse_sectors(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    config: &Config,
    source: &Path,
) -> Result<Vec<SectorReading>> {
    let processing = &config.race_processing;
    let scale = processing.default_resize_scale;
    let geometry = GridGeometry::from_config(config);

    let preprocessed = preprocess_image(image, scale, true);
    let cells = split_sectors(&preprocessed, scale, &geometry)
        .with_context(|| format!("Sector layout mismatch in {}", source.display()))?;
    let raw = read_sector_values(engine, &cells, processing.bright_pixel_threshold)?;

    let readings = raw
        .chunks(SECTORS_PER_ROW)
        .map(|row| {
            let mut times = [0.0; SECTORS_PER_ROW];
            for (slot, value) in times.iter_mut().zip(row) {
                *slot = parse_sector_time(value).unwrap_or_else(|e| {
                    warn!("Sector parsing failure in {}: {}", source.display(), e);
                    0.0
                });
            }
            SectorReading::new(times)
        })
        .collect();
    Ok(readings)
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Runs OCR and reconciliation over every pair in order.
///
/// `on_progress(done, total)` is called after each pair. Unreadable files
/// and unidentified frames are skipped; a grid layout mismatch stops the
/// pass.
pub fn process_screenshots<R: Rng + ?Sized>(
    engine: &dyn OcrEngine,
    pairs: &[ScreenshotPair],
    config: &Config,
    rng: &mut R,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<History> {
    let mut reconciler = Reconciler::new(&config.race_processing);
    let (mut merged, mut redundant, mut unidentified) = (0usize, 0usize, 0usize);

    for (done, pair) in pairs.iter().enumerate() {
        let images = load_image(&pair.drivers).and_then(|d| Ok((d, load_image(&pair.sectors)?)));
        let (driver_image, sector_image) = match images {
            Ok(images) => images,
            Err(e) => {
                warn!("Skipping screenshot {}: {:#}", pair.index, e);
                on_progress(done + 1, pairs.len());
                continue;
            }
        };

        let drivers = resolve_drivers(engine, &driver_image, config, rng)
            .with_context(|| format!("Driver layout mismatch in {}", pair.drivers.display()))?;
        let sectors = parse_sectors(engine, &sector_image, config, &pair.sectors)?;

        match reconciler.ingest(&drivers, sectors) {
            FrameOutcome::Merged => merged += 1,
            FrameOutcome::Redundant => redundant += 1,
            FrameOutcome::Unidentified => unidentified += 1,
        }
        on_progress(done + 1, pairs.len());
    }

    info!(
        "Processed {} screenshots: {} merged, {} unchanged, {} unidentified",
        pairs.len(),
        merged,
        redundant,
        unidentified
    );
    Ok(reconciler.into_history())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::ocr::testing::{CyclingEngine, ScriptedEngine};
    use image::{GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    /// Writes a fully lit driver crop and sector crop for `rows` positions.
    fn write_pair(screenshots: &Path, index: u64, rows: u32) {
        fs::create_dir_all(drivers_dir(screenshots)).unwrap();
        fs::create_dir_all(sectors_dir(screenshots)).unwrap();
        GrayImage::from_pixel(42, 21 * rows, Luma([220]))
            .save(drivers_dir(screenshots).join(format!("{}.png", index)))
            .unwrap();
        GrayImage::from_pixel(210, 21 * rows, Luma([220]))
            .save(sectors_dir(screenshots).join(format!("{}.png", index)))
            .unwrap();
    }

    #[test]
    fn test_pairs_sorted_numerically() {
        let dir = tempdir().unwrap();
        for index in [10, 2, 1] {
            write_pair(dir.path(), index, 1);
        }
        fs::write(drivers_dir(dir.path()).join("notes.txt"), "x").unwrap();

        let pairs = list_screenshot_pairs(dir.path()).unwrap();
        let indices: Vec<u64> = pairs.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 10]);
        assert!(pairs[2].sectors.ends_with("sectors/10.png"));
    }

    #[test]
    fn test_pairs_truncated_to_shorter_side() {
        let dir = tempdir().unwrap();
        write_pair(dir.path(), 1, 1);
        write_pair(dir.path(), 2, 1);
        fs::remove_file(sectors_dir(dir.path()).join("2.png")).unwrap();

        assert_eq!(list_screenshot_pairs(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_screenshot_dir_is_error() {
        let dir = tempdir().unwrap();
        assert!(list_screenshot_pairs(&dir.path().join("nothing")).is_err());
    }

    #[test]
    fn test_parse_failure_zeroes_only_that_cell() {
        let config = test_config(1, &["HAM"]);
        let engine = ScriptedEngine::texts(&["31.456\n", "12a.34X\n", "25.100\n"]);
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(210, 21, Luma([220])));

        let readings = parse_sectors(&engine, &image, &config, Path::new("1.png")).unwrap();
        assert_eq!(readings, vec![SectorReading::new([31.456, 0.0, 25.1])]);
    }

    #[test]
    fn test_parse_sectors_layout_mismatch() {
        let config = test_config(2, &["HAM"]);
        let engine = ScriptedEngine::texts(&[]);
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(210, 21 * 3, Luma([220])));

        assert!(parse_sectors(&engine, &image, &config, Path::new("1.png")).is_err());
    }

    #[test]
    fn test_identical_frames_merge_once() {
        let dir = tempdir().unwrap();
        write_pair(dir.path(), 1, 2);
        write_pair(dir.path(), 2, 2);
        let pairs = list_screenshot_pairs(dir.path()).unwrap();

        let config = test_config(2, &["HAM", "VER"]);
        let engine = CyclingEngine::new(&["HAM", "VER"], &["30.100", "40.200", "25.300"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut progress = Vec::new();

        let history =
            process_screenshots(&engine, &pairs, &config, &mut rng, |done, total| {
                progress.push((done, total))
            })
            .unwrap();

        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        assert_eq!(history.series("HAM", 1), &[30.1]);
        assert_eq!(history.series("VER", 3), &[25.3]);
    }

    #[test]
    fn test_unidentified_frame_is_discarded() {
        let dir = tempdir().unwrap();
        write_pair(dir.path(), 1, 2);
        let pairs = list_screenshot_pairs(dir.path()).unwrap();

        let config = test_config(2, &["HAM", "VER"]);
        let engine = CyclingEngine::new(&["XXX"], &["30.100"]);
        let mut rng = StdRng::seed_from_u64(3);

        let history = process_screenshots(&engine, &pairs, &config, &mut rng, |_, _| {}).unwrap();
        assert!(history.is_empty());
        assert_eq!(engine.driver_calls(), 21 * 2);
    }

    #[test]
    fn test_unreadable_pair_is_skipped() {
        let dir = tempdir().unwrap();
        write_pair(dir.path(), 1, 2);
        fs::write(drivers_dir(dir.path()).join("1.png"), b"not a png").unwrap();
        let pairs = list_screenshot_pairs(dir.path()).unwrap();

        let config = test_config(2, &["HAM", "VER"]);
        let engine = ScriptedEngine::texts(&[]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut calls = 0;

        let history =
            process_screenshots(&engine, &pairs, &config, &mut rng, |_, _| calls += 1).unwrap();
        assert!(history.is_empty());
        assert_eq!(calls, 1);
        assert_eq!(engine.calls.get(), 0);
    }

    #[test]
    fn test_driver_layout_mismatch_stops_pass() {
        let dir = tempdir().unwrap();
        write_pair(dir.path(), 1, 3);
        let pairs = list_screenshot_pairs(dir.path()).unwrap();

        let config = test_config(2, &["HAM", "VER"]);
        let engine = ScriptedEngine::texts(&[]);
        let mut rng = StdRng::seed_from_u64(3);

        let err = process_screenshots(&engine, &pairs, &config, &mut rng, |_, _| {}).unwrap_err();
        assert!(format!("{:#}", err).contains("expected 2"));
    }
}
