use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

/// 3×3 sharpening kernel, row-major.
const SHARPEN_KERNEL: [i32; 9] = [-1, -1, -1, -1, 9, -1, -1, -1, -1];

/// Linear gain applied when contrast boosting is requested.
const CONTRAST_GAIN: u32 = 2;

/// Prepares an overlay crop for OCR.
///
/// Converts to grayscale, scales both axes by `resize_scale` (bilinear),
/// optionally doubles intensities (saturating at 255), then sharpens with
/// a 3×3 kernel (center 9, neighbours −1).
pub fn preprocess_image(img: &DynamicImage, resize_scale: u32, contrast: bool) -> GrayImage {
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    let mut resized = imageops::resize(&gray, w * resize_scale, h * resize_scale, FilterType::Triangle);

    if contrast {
        for pixel in resized.pixels_mut() {
            pixel[0] = (pixel[0] as u32 * CONTRAST_GAIN).min(255) as u8;
        }
    }

    sharpen(&resized)
}

/// Applies the sharpening kernel, saturating to u8. Pixels past the border
/// repeat the nearest edge pixel.
pub fn sharpen(img: &GrayImage) -> GrayImage {
    filter_clamped(img, Kernel::new(&SHARPEN_KERNEL, 3, 3))
}

/// Returns true if any pixel is strictly brighter than `threshold`.
///
/// Empty grid rows are fully dark after preprocessing, so this is used to
/// skip OCR on them.
pub fn has_bright_pixels(img: &GrayImage, threshold: u8) -> bool {
    img.pixels().any(|p| p[0] > threshold)
}
