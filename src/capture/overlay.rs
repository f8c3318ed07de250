//! Regions of the broadcast frame holding the timing overlay.

use image::{imageops, Rgb, RgbImage};

use crate::config::Config;

/// Rectangle in 720p frame coordinates: (x0, y0, x1, y1), end-exclusive.
type Region = (f64, f64, f64, f64);

/// Driver codes and sector times, drivers column through sector 3.
const OVERLAY_720: Region = (106.0, 107.0, 1215.0, 525.0);
/// Width of the driver code column inside the overlay.
const DRIVERS_WIDTH_720: f64 = 42.0;
/// Start of the sector columns inside the overlay.
const SECTORS_X_720: f64 = 910.0;
/// Banner shown above the overlay during a red flag.
const RED_FLAG_720: Region = (285.0, 35.0, 800.0, 60.0);

/// Minimum saturation and value of a red pixel (OpenCV 8-bit HSV).
const RED_MIN_SATURATION: u8 = 50;
const RED_MIN_VALUE: u8 = 20;

/// Pixel rectangles for a given recording resolution.
#[derive(Clone, Copy, Debug)]
pub struct OverlayGeometry {
    res_mul: f64,
}

impl OverlayGeometry {
    pub fn new(res_mul: f64) -> Self {
        Self { res_mul }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.res_mul())
    }

    fn scaled(&self, v: f64) -> u32 {
        (v * self.res_mul) as u32
    }

    /// Crops `region`, clamped to the frame.
    fn crop(&self, frame: &RgbImage, region: Region) -> RgbImage {
        let (x0, y0, x1, y1) = region;
        let x0 = self.scaled(x0).min(frame.width());
        let y0 = self.scaled(y0).min(frame.height());
        let x1 = self.scaled(x1).clamp(x0, frame.width());
        let y1 = self.scaled(y1).clamp(y0, frame.height());
        imageops::crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image()
    }

    /// Splits the overlay into the driver column and the sector columns.
    pub fn split_overlay(&self, frame: &RgbImage) -> (RgbImage, RgbImage) {
        let overlay = self.crop(frame, OVERLAY_720);
        let (width, height) = overlay.dimensions();

        let drivers_width = self.scaled(DRIVERS_WIDTH_720).min(width);
        let sectors_x = self.scaled(SECTORS_X_720).min(width);

        let drivers = imageops::crop_imm(&overlay, 0, 0, drivers_width, height).to_image();
        let sectors = imageops::crop_imm(&overlay, sectors_x, 0, width - sectors_x, height).to_image();
        (drivers, sectors)
    }

    /// Returns true if any pixel of the banner region is red.
    pub fn is_red_flag(&self, frame: &RgbImage) -> bool {
        self.crop(frame, RED_FLAG_720).pixels().any(|&p| is_red(p))
    }
}

/// Converts to OpenCV's 8-bit HSV: H in [0, 180), S and V in [0, 255].
pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> (u8, u8, u8) {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    ((h / 2.0).round() as u8, s.round() as u8, max as u8)
}

/// Red hue at either end of the hue circle, saturated and not too dark.
fn is_red(pixel: Rgb<u8>) -> bool {
    let (h, s, v) = rgb_to_hsv(pixel);
    let red_hue = h <= 5 || (175..=180).contains(&h);
    red_hue && s >= RED_MIN_SATURATION && v >= RED_MIN_VALUE
}
