//! Accumulated sector times per driver.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Sector numbers in lap order.
pub const SECTORS: [u8; 3] = [1, 2, 3];

/// One driver's times for sectors 1-3 in a single frame. `0.0` means no
/// valid reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorReading([f64; 3]);

impl SectorReading {
    pub fn new(times: [f64; 3]) -> Self {
        Self(times)
    }

    /// Time for `sector` (1-based).
    pub fn get(&self, sector: u8) -> f64 {
        self.0[sector as usize - 1]
    }

    pub fn set(&mut self, sector: u8, time: f64) {
        self.0[sector as usize - 1] = time;
    }

    pub fn times(&self) -> [f64; 3] {
        self.0
    }
}

/// driver code → sector number → times in the order they were appended.
///
/// Zeros are kept as "no new reading" placeholders so that every processed
/// frame adds one entry per sector for each driver it saw.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(BTreeMap<String, BTreeMap<u8, Vec<f64>>>);

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, driver: &str, sector: u8, time: f64) {
        self.0
            .entry(driver.to_string())
            .or_default()
            .entry(sector)
            .or_default()
            .push(time);
    }

    /// All times recorded for a driver/sector, oldest first.
    pub fn series(&self, driver: &str, sector: u8) -> &[f64] {
        self.0
            .get(driver)
            .and_then(|sectors| sectors.get(&sector))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Most recent nonzero time for a driver/sector, or 0.
    pub fn last_real_time(&self, driver: &str, sector: u8) -> f64 {
        self.series(driver, sector)
            .iter()
            .rev()
            .copied()
            .find(|&t| t > 0.0)
            .unwrap_or(0.0)
    }

    pub fn contains_driver(&self, driver: &str) -> bool {
        self.0.contains_key(driver)
    }

    /// Number of sectors with at least one entry for `driver`.
    pub fn sectors_recorded(&self, driver: &str) -> usize {
        self.0.get(driver).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes the history as JSON, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize sector data")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Reads a history written by `save`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!(
                "No sector data at {}. Gather and process the screenshots before visualizing.",
                path.display()
            ));
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse sector data: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_creates_entries() {
        let mut history = History::new();
        history.append("HAM", 1, 30.5);
        history.append("HAM", 1, 0.0);
        history.append("HAM", 3, 25.0);

        assert_eq!(history.series("HAM", 1), &[30.5, 0.0]);
        assert_eq!(history.series("HAM", 2), &[] as &[f64]);
        assert_eq!(history.sectors_recorded("HAM"), 2);
        assert_eq!(history.series("VER", 1), &[] as &[f64]);
    }

    #[test]
    fn test_last_real_time_skips_placeholders() {
        let mut history = History::new();
        assert_eq!(history.last_real_time("HAM", 1), 0.0);

        history.append("HAM", 1, 30.5);
        history.append("HAM", 1, 0.0);
        history.append("HAM", 1, 0.0);
        assert_eq!(history.last_real_time("HAM", 1), 30.5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output").join("sector_data.json");

        let mut history = History::new();
        history.append("HAM", 2, 41.25);
        history.save(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"HAM\""));
        assert!(json.contains("\"2\""));
        assert_eq!(History::load(&path).unwrap(), history);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sector_data.json");

        let mut first = History::new();
        first.append("HAM", 1, 30.0);
        first.save(&path).unwrap();
        History::new().save(&path).unwrap();

        assert!(History::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_asks_for_processing() {
        let dir = tempdir().unwrap();
        let err = History::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("process the screenshots"));
    }
}
