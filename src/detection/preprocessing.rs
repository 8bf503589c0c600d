use image::{DynamicImage, GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Fixed binary threshold: pixels strictly above `cutoff` become white,
/// everything else black.
pub fn binarize(img: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        *pixel = if pixel[0] > cutoff { Luma([255u8]) } else { Luma([0u8]) };
    }
    out
}

/// Row index where the bottom `fraction` of an image of `height` rows starts
pub fn bottom_band_top(height: u32, fraction: f64) -> u32 {
    let fraction = fraction.clamp(0.0, 1.0);
    let top = (height as f64 * (1.0 - fraction)) as u32;
    top.min(height.saturating_sub(1))
}
