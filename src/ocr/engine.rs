use anyhow::{anyhow, Result};
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

/// Characters the recognizer may emit for a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whitelist {
    /// Letters used by driver codes
    DriverCode,
    /// Digits and the decimal point
    SectorTime,
}

impl Whitelist {
    pub fn chars(&self) -> &'static str {
        match self {
            Whitelist::DriverCode => "ABCDEFGHIJKLMNOPQRSTUVW",
            Whitelist::SectorTime => "0123456789.",
        }
    }
}

/// Recognizes the text in a single overlay cell.
///
/// Implementations are handed in by the caller so the processing pass never
/// has to know where (or whether) an OCR installation lives.
pub trait OcrEngine {
    fn recognize(&self, img: &GrayImage, whitelist: Whitelist) -> Result<String>;
}

/// Runs the Tesseract command-line tool, one process per cell.
pub struct TesseractCli {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
}

impl TesseractCli {
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>) -> Self {
        Self { executable, tessdata }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(&self, input: &Path, whitelist: Whitelist) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg("stdout");
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        cmd.arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("8") // Single word
            .arg("--oem")
            .arg("3")
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", whitelist.chars()));
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, img: &GrayImage, whitelist: Whitelist) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let output = self.command(temp_input.path(), whitelist).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
