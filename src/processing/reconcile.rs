//! Frame-to-frame reconciliation of sector readings.
//!
//! Screenshots are sampled more sparsely than the overlay refreshes, so most
//! frames repeat what the previous one showed. The reconciler drops whole
//! frames that barely changed, blanks readings that repeat the last recorded
//! time, and appends everything else to the history.

use log::debug;
use std::collections::BTreeMap;

use super::history::{History, SectorReading, SECTORS};
use crate::config::ProcessingConfig;

/// What happened to a frame handed to `Reconciler::ingest`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Within the almost-equal threshold of the previous frame; nothing changed
    Redundant,
    /// Drivers or sectors could not be read; history unchanged
    Unidentified,
    /// Readings appended to the history
    Merged,
}

/// Zeroes every time outside the open interval (min, max).
pub fn limit_sector_times(sectors: &mut [SectorReading], min: f64, max: f64) {
    for reading in sectors.iter_mut() {
        for sector in SECTORS {
            let time = reading.get(sector);
            if !(min < time && time < max) {
                reading.set(sector, 0.0);
            }
        }
    }
}

/// Returns true if two frames are the same for practical purposes.
///
/// Identical frames always are. Otherwise the grids must differ in length by
/// at most one row and their summed absolute difference over shared rows
/// must stay below `threshold` seconds.
pub fn is_almost_equal(old: &[SectorReading], new: &[SectorReading], threshold: f64) -> bool {
    if old == new {
        return true;
    }
    if old.len().abs_diff(new.len()) > 1 {
        return false;
    }

    let diff: f64 = old
        .iter()
        .zip(new)
        .flat_map(|(o, n)| SECTORS.map(|s| (o.get(s) - n.get(s)).abs()))
        .sum();
    diff < threshold
}

/// Blanks each reading equal to the driver's last recorded nonzero time.
///
/// This also drops a genuinely new time that happens to equal the previous
/// one exactly.
pub fn suppress_unchanged(history: &History, frame: &mut BTreeMap<String, SectorReading>) {
    for (driver, reading) in frame.iter_mut() {
        if !history.contains_driver(driver) {
            continue;
        }
        for sector in SECTORS {
            if reading.get(sector) == history.last_real_time(driver, sector) {
                reading.set(sector, 0.0);
            }
        }
    }
}

/// Pairs codes with readings by grid position. A code seen twice keeps the
/// later reading.
fn pair_readings(drivers: &[String], sectors: &[SectorReading]) -> BTreeMap<String, SectorReading> {
    drivers.iter().cloned().zip(sectors.iter().copied()).collect()
}

/// Carries the previous frame and the cumulative history across frames.
#[derive(Debug)]
pub struct Reconciler {
    min_time: f64,
    max_time: f64,
    almost_equal_threshold: f64,
    previous: Vec<SectorReading>,
    history: History,
}

impl Reconciler {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            min_time: config.min_sector_time,
            max_time: config.max_sector_time,
            almost_equal_threshold: config.almost_equal_threshold,
            previous: Vec::new(),
            history: History::new(),
        }
    }

    /// Reconciles one frame. Frames must arrive in capture order.
    pub fn ingest(&mut self, drivers: &[String], mut sectors: Vec<SectorReading>) -> FrameOutcome {
        limit_sector_times(&mut sectors, self.min_time, self.max_time);

        if is_almost_equal(&self.previous, &sectors, self.almost_equal_threshold) {
            debug!("Frame matches the previous one, skipping");
            return FrameOutcome::Redundant;
        }

        // An unidentified frame still becomes the baseline for the next one.
        if drivers.is_empty() || sectors.is_empty() {
            self.previous = sectors;
            return FrameOutcome::Unidentified;
        }

        let mut frame = pair_readings(drivers, &sectors);
        self.previous = sectors;
        suppress_unchanged(&self.history, &mut frame);

        for (driver, reading) in &frame {
            for sector in SECTORS {
                self.history.append(driver, sector, reading.get(sector));
            }
        }

        FrameOutcome::Merged
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }
}
