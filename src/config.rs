//! Race configuration loaded from config.json.
//!
//! Read once at startup and passed by reference to every stage. Processing
//! tunables fall back to defaults when absent; the roster and grid size are
//! required.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Vertical resolution the overlay geometry was measured at.
pub const BASE_RESOLUTION: f64 = 720.0;

/// One roster entry: a 3-letter driver code and the team it drives for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverEntry {
    pub name: String,
    pub team: String,
}

/// Settings for the OCR/reconciliation pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of rows in the timing overlay
    pub drivers_on_grid: usize,
    /// Sector times at or below this are treated as misreads
    #[serde(default = "default_min_sector_time")]
    pub min_sector_time: f64,
    /// Sector times at or above this are treated as misreads
    #[serde(default = "default_max_sector_time")]
    pub max_sector_time: f64,
    /// Total absolute difference (seconds) under which two frames are the same
    #[serde(default = "default_almost_equal_threshold")]
    pub almost_equal_threshold: f64,
    /// Retries with a random resize scale when a driver code can't be matched
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "default_retry_scale_min")]
    pub retry_scale_min: u32,
    #[serde(default = "default_retry_scale_max")]
    pub retry_scale_max: u32,
    /// Resize scale for the first OCR attempt
    #[serde(default = "default_resize_scale")]
    pub default_resize_scale: u32,
    /// A cell with no pixel above this is blank
    #[serde(default = "default_bright_pixel_threshold")]
    pub bright_pixel_threshold: u8,
}

fn default_min_sector_time() -> f64 {
    10.0
}

fn default_max_sector_time() -> f64 {
    100.0
}

fn default_almost_equal_threshold() -> f64 {
    1.0
}

fn default_retry_limit() -> u32 {
    20
}

fn default_retry_scale_min() -> u32 {
    2
}

fn default_retry_scale_max() -> u32 {
    10
}

fn default_resize_scale() -> u32 {
    4
}

fn default_bright_pixel_threshold() -> u8 {
    200
}

impl ProcessingConfig {
    pub fn new(drivers_on_grid: usize) -> Self {
        Self {
            drivers_on_grid,
            min_sector_time: default_min_sector_time(),
            max_sector_time: default_max_sector_time(),
            almost_equal_threshold: default_almost_equal_threshold(),
            retry_limit: default_retry_limit(),
            retry_scale_min: default_retry_scale_min(),
            retry_scale_max: default_retry_scale_max(),
            default_resize_scale: default_resize_scale(),
            bright_pixel_threshold: default_bright_pixel_threshold(),
        }
    }
}

/// Settings for screenshot gathering.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatheringConfig {
    /// Seconds between captured frames
    pub step: f64,
    /// Minutes skipped at the start of the recording
    pub start_offset_min: f64,
    /// Minutes ignored at the end of the recording
    pub end_offset_min: f64,
}

impl Default for GatheringConfig {
    fn default() -> Self {
        Self {
            step: 5.0,
            start_offset_min: 0.0,
            end_offset_min: 0.0,
        }
    }
}

/// Settings for chart generation. Arrays are indexed by sector - 1.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub excluded_drivers: Vec<String>,
    pub distribution_offset: [f64; 3],
    pub min_times: [f64; 3],
    pub max_times: [f64; 3],
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            excluded_drivers: Vec::new(),
            distribution_offset: [20.0, 20.0, 20.0],
            min_times: [10.0, 10.0, 10.0],
            max_times: [100.0, 100.0, 100.0],
        }
    }
}

/// Complete configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Vertical resolution of the recording (720, 1080, ...)
    pub resolution: u32,
    pub race_processing: ProcessingConfig,
    #[serde(default)]
    pub race_gathering: GatheringConfig,
    #[serde(default)]
    pub race_visualization: VisualizationConfig,
    pub drivers: Vec<DriverEntry>,
    /// Team colours as single-entry maps: `[{"Ferrari": "#DC0000"}, ...]`
    #[serde(default)]
    pub teams: Vec<HashMap<String, String>>,
    /// Explicit Tesseract executable, tried before any discovery
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
}

impl Config {
    /// Loads and validates the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        log::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(anyhow!("resolution must be positive"));
        }
        let processing = &self.race_processing;
        if processing.drivers_on_grid == 0 {
            return Err(anyhow!("race_processing.drivers_on_grid must be positive"));
        }
        if processing.retry_scale_min == 0 || processing.retry_scale_min > processing.retry_scale_max {
            return Err(anyhow!(
                "invalid retry scale range [{}, {}]",
                processing.retry_scale_min,
                processing.retry_scale_max
            ));
        }
        if processing.default_resize_scale == 0 {
            return Err(anyhow!("race_processing.default_resize_scale must be positive"));
        }
        if self.drivers.is_empty() {
            return Err(anyhow!("driver roster is empty"));
        }
        Ok(())
    }

    /// Scale of the recording relative to the 720p overlay measurements.
    pub fn res_mul(&self) -> f64 {
        self.resolution as f64 / BASE_RESOLUTION
    }

    /// Driver codes in roster order.
    pub fn roster(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.name.clone()).collect()
    }

    /// Team name → colour string.
    pub fn team_colors(&self) -> HashMap<String, String> {
        self.teams
            .iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }

    /// Locates config.json: explicit path, next to the executable, then the
    /// working directory.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        let beside_exe = crate::paths::get_exe_dir().join("config.json");
        if beside_exe.exists() {
            return beside_exe;
        }
        PathBuf::from("config.json")
    }
}

#[cfg(test)]
pub(crate) fn test_config(drivers_on_grid: usize, roster: &[&str]) -> Config {
    Config {
        resolution: 720,
        race_processing: ProcessingConfig::new(drivers_on_grid),
        race_gathering: GatheringConfig::default(),
        race_visualization: VisualizationConfig::default(),
        drivers: roster
            .iter()
            .map(|name| DriverEntry {
                name: name.to_string(),
                team: "Test".to_string(),
            })
            .collect(),
        teams: vec![HashMap::from([("Test".to_string(), "#112233".to_string())])],
        tesseract_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r##"{
        "resolution": 1080,
        "race_processing": { "drivers_on_grid": 20 },
        "race_gathering": { "step": 2, "start_offset_min": 5, "end_offset_min": 3 },
        "race_visualization": {
            "excluded_drivers": ["MAZ"],
            "distribution_offset": [25, 24, 20],
            "max_times": [40, 35, 30],
            "min_times": [28, 25, 20]
        },
        "drivers": [
            { "name": "HAM", "team": "Mercedes" },
            { "name": "VER", "team": "Red Bull" }
        ],
        "teams": [ { "Mercedes": "#00D2BE" }, { "Red Bull": "#0600EF" } ]
    }"##;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_with_defaults() {
        let file = write_config(SAMPLE);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.race_processing.drivers_on_grid, 20);
        assert_eq!(config.race_processing.retry_limit, 20);
        assert!((config.race_processing.min_sector_time - 10.0).abs() < f64::EPSILON);
        assert!((config.race_processing.max_sector_time - 100.0).abs() < f64::EPSILON);
        assert!((config.res_mul() - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.roster(), vec!["HAM", "VER"]);
        assert_eq!(config.race_visualization.excluded_drivers, vec!["MAZ"]);
    }

    #[test]
    fn test_team_colors_flattened() {
        let file = write_config(SAMPLE);
        let config = Config::load(file.path()).unwrap();
        let colors = config.team_colors();
        assert_eq!(colors.get("Mercedes").map(String::as_str), Some("#00D2BE"));
        assert_eq!(colors.get("Red Bull").map(String::as_str), Some("#0600EF"));
    }

    #[test]
    fn test_empty_roster_rejected() {
        let file = write_config(
            r#"{ "resolution": 720, "race_processing": { "drivers_on_grid": 20 }, "drivers": [] }"#,
        );
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Config::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
