//! OCR over the timing overlay crops.
//!
//! - `preprocess`: grayscale/resize/contrast/sharpen
//! - `split`: fixed grid geometry into per-driver and per-sector cells
//! - `engine`: the `OcrEngine` seam and the Tesseract CLI implementation
//! - `extract`: per-cell recognition and text cleanup
//! - `setup`: locating the Tesseract installation

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;
pub mod split;

pub use engine::{OcrEngine, TesseractCli, Whitelist};
pub use preprocess::{has_bright_pixels, preprocess_image};
pub use setup::ensure_tesseract;
pub use split::{split_drivers, split_sectors, GridGeometry, SplitError};

#[cfg(test)]
pub(crate) mod testing;
