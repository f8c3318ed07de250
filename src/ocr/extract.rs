use anyhow::{Context, Result};
use image::GrayImage;
use log::{debug, warn};
use regex::Regex;

use super::engine::{OcrEngine, Whitelist};
use super::preprocess::has_bright_pixels;

/// Length of a driver code on the overlay.
pub const DRIVER_CODE_LEN: usize = 3;

/// A sector time is always six characters ("31.456"). Taking the first
/// six-character run drops trailing OCR artifacts.
const SECTOR_PATTERN: &str = r".{6}";

/// Raw value used for a sector cell with nothing readable in it.
pub const EMPTY_SECTOR: &str = "0";

/// Runs OCR on one cell, treating blank cells and engine failures as empty text.
fn recognize_cell(
    engine: &dyn OcrEngine,
    cell: &GrayImage,
    whitelist: Whitelist,
    bright_threshold: u8,
) -> String {
    if !has_bright_pixels(cell, bright_threshold) {
        return String::new();
    }
    match engine.recognize(cell, whitelist) {
        Ok(text) => text,
        Err(e) => {
            warn!("OCR failed for {:?} cell: {}", whitelist, e);
            String::new()
        }
    }
}

/// Trims page/line breaks and keeps the first three characters.
pub fn clean_driver_text(raw: &str) -> String {
    raw.trim_matches(|c| c == '\u{c}' || c == '\n')
        .chars()
        .take(DRIVER_CODE_LEN)
        .collect()
}

/// Returns the first six-character run, or "0" if the text is shorter.
pub fn sector_raw_value(raw: &str, pattern: &Regex) -> String {
    pattern
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| EMPTY_SECTOR.to_string())
}

/// Parses a raw sector value as seconds.
pub fn parse_sector_time(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("not a sector time: {:?}", raw))
}

/// Reads one raw driver code per band. Blank bands yield "".
pub fn read_driver_codes(
    engine: &dyn OcrEngine,
    bands: &[GrayImage],
    bright_threshold: u8,
) -> Vec<String> {
    bands
        .iter()
        .map(|band| {
            let text = recognize_cell(engine, band, Whitelist::DriverCode, bright_threshold);
            clean_driver_text(&text)
        })
        .collect()
}

/// Reads the raw sector value of every cell, preserving cell order.
pub fn read_sector_values(
    engine: &dyn OcrEngine,
    cells: &[GrayImage],
    bright_threshold: u8,
) -> Result<Vec<String>> {
    let pattern = Regex::new(SECTOR_PATTERN)?;
    let values: Vec<String> = cells
        .iter()
        .map(|cell| {
            let text = recognize_cell(engine, cell, Whitelist::SectorTime, bright_threshold);
            if text.is_empty() {
                EMPTY_SECTOR.to_string()
            } else {
                sector_raw_value(&text, &pattern)
            }
        })
        .collect();
    debug!("Raw sector values: {:?}", values);
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::ScriptedEngine;
    use anyhow::anyhow;
    use image::Luma;

    fn lit() -> GrayImage {
        GrayImage::from_pixel(4, 4, Luma([255]))
    }

    fn dark() -> GrayImage {
        GrayImage::from_pixel(4, 4, Luma([10]))
    }

    #[test]
    fn test_clean_driver_text() {
        assert_eq!(clean_driver_text("HAM\n\u{c}"), "HAM");
        assert_eq!(clean_driver_text("VERR\n"), "VER");
        assert_eq!(clean_driver_text("\u{c}"), "");
    }

    #[test]
    fn test_sector_raw_value_takes_first_six() {
        let re = Regex::new(SECTOR_PATTERN).unwrap();
        assert_eq!(sector_raw_value("31.456\n\u{c}", &re), "31.456");
        assert_eq!(sector_raw_value("31.4567\n", &re), "31.456");
        assert_eq!(sector_raw_value("1.2\n", &re), "0");
    }

    #[test]
    fn test_parse_sector_time() {
        assert!((parse_sector_time("31.456").unwrap() - 31.456).abs() < 1e-9);
        assert!((parse_sector_time("0").unwrap()).abs() < 1e-9);
        assert!(parse_sector_time("12a.34").is_err());
        assert!(parse_sector_time("3..456").is_err());
    }

    #[test]
    fn test_blank_cells_skip_ocr() {
        let engine = ScriptedEngine::texts(&["HAM\n"]);
        let codes = read_driver_codes(&engine, &[dark(), lit()], 200);

        assert_eq!(codes, vec!["", "HAM"]);
        assert_eq!(engine.calls.get(), 1);
    }

    #[test]
    fn test_engine_error_degrades_to_empty() {
        let engine = ScriptedEngine::new(vec![Err(anyhow!("not installed")), Ok("27.001".to_string())]);
        let values = read_sector_values(&engine, &[lit(), lit(), dark()], 200).unwrap();
        assert_eq!(values, vec!["0", "27.001", "0"]);
    }

    #[test]
    fn test_artifacts_survive_to_parse() {
        let engine = ScriptedEngine::texts(&["12a.34X\n"]);
        let values = read_sector_values(&engine, &[lit()], 200).unwrap();
        assert_eq!(values, vec!["12a.34"]);
        assert!(parse_sector_time(&values[0]).is_err());
    }
}
