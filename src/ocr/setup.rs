use anyhow::{anyhow, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use super::engine::TesseractCli;

/// Common Windows install locations.
const COMMON_PATHS: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// Returns true if `program --version` runs successfully.
fn responds_to_version(program: &Path) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable.
///
/// Order: explicit path, `TESSERACT_PATH`, `PATH`, common install locations.
pub fn find_tesseract_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured tesseract_path does not exist: {}", path.display());
    }

    if let Ok(env_path) = std::env::var("TESSERACT_PATH") {
        let p = PathBuf::from(env_path);
        if p.exists() {
            return Ok(p);
        }
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    for path in &COMMON_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Directories searched for tessdata: beside the executable, then under
/// `prefix` (the value of `TESSDATA_PREFIX`).
fn tessdata_candidates(executable: &Path, prefix: Option<&str>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(parent) = executable.parent() {
        candidates.push(parent.join("tessdata"));
    }
    if let Some(prefix) = prefix {
        candidates.push(PathBuf::from(prefix));
        candidates.push(PathBuf::from(prefix).join("tessdata"));
    }
    candidates
}

/// Finds a tessdata directory containing eng.traineddata, if any.
/// `None` lets Tesseract use its compiled-in default.
pub fn find_tessdata_dir(executable: &Path) -> Option<PathBuf> {
    let prefix = std::env::var("TESSDATA_PREFIX").ok();
    tessdata_candidates(executable, prefix.as_deref())
        .into_iter()
        .find(|p| p.join("eng.traineddata").exists())
}

/// Builds the Tesseract engine, checking the installation once.
///
/// A missing installation only produces a warning: the engine still points
/// at `tesseract` and every cell will fail to recognize, degrading to blank
/// readings instead of aborting the run.
pub fn ensure_tesseract(explicit: Option<&Path>) -> TesseractCli {
    match find_tesseract_executable(explicit) {
        Ok(executable) => {
            let tessdata = find_tessdata_dir(&executable);
            info!("Tesseract found at: {}", executable.display());
            if let Some(ref td) = tessdata {
                info!("Using tessdata at: {}", td.display());
            }
            TesseractCli::new(executable, tessdata)
        }
        Err(e) => {
            warn!("{}", e);
            warn!("OCR will fail for every cell until Tesseract is installed.");
            TesseractCli::new(PathBuf::from("tesseract"), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("tesseract");
        std::fs::write(&exe, "").unwrap();

        let found = find_tesseract_executable(Some(&exe)).unwrap();
        assert_eq!(found, exe);
    }

    #[test]
    fn test_tessdata_beside_executable() {
        let dir = tempdir().unwrap();
        let tessdata = dir.path().join("tessdata");
        std::fs::create_dir_all(&tessdata).unwrap();
        std::fs::write(tessdata.join("eng.traineddata"), "").unwrap();

        let found = find_tessdata_dir(&dir.path().join("tesseract"));
        assert_eq!(found, Some(tessdata));
    }

    #[test]
    fn test_tessdata_candidates() {
        let exe = Path::new("/opt/tesseract/bin/tesseract");
        assert_eq!(
            tessdata_candidates(exe, None),
            vec![PathBuf::from("/opt/tesseract/bin/tessdata")]
        );
        assert_eq!(
            tessdata_candidates(exe, Some("/usr/share")),
            vec![
                PathBuf::from("/opt/tesseract/bin/tessdata"),
                PathBuf::from("/usr/share"),
                PathBuf::from("/usr/share/tessdata"),
            ]
        );
    }
}
