use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the driver-region screenshot directory: `<screenshots>/drivers/`
pub fn drivers_dir(screenshots: &Path) -> PathBuf {
    screenshots.join("drivers")
}

/// Returns the sector-region screenshot directory: `<screenshots>/sectors/`
pub fn sectors_dir(screenshots: &Path) -> PathBuf {
    screenshots.join("sectors")
}

/// Returns the processed history file: `<output>/sector_data.json`
pub fn sector_data_path(output: &Path) -> PathBuf {
    output.join("sector_data.json")
}

/// Returns the per-driver statistics file: `<output>/sector_statistics.json`
pub fn statistics_path(output: &Path) -> PathBuf {
    output.join("sector_statistics.json")
}

/// Ensures the screenshot and output directories exist.
pub fn ensure_directories(screenshots: &Path, output: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(drivers_dir(screenshots))?;
    std::fs::create_dir_all(sectors_dir(screenshots))?;
    std::fs::create_dir_all(output)?;
    Ok(())
}
