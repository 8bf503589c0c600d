use image::{DynamicImage, Rgb, RgbImage};
use isbnscan::detection::ean::{encode_ean13, render_modules};
use isbnscan::{Result, TextRecognizer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// White 600x800 "back cover" with nothing printed on it.
pub fn blank_cover() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(600, 800, Rgb([255, 255, 255])))
}

/// Back cover with a clean EAN-13 for `code` printed near the bottom.
pub fn cover_with_barcode(code: &str) -> DynamicImage {
    let modules = encode_ean13(code).expect("test code must have a valid check digit");
    let barcode = render_modules(&modules, 3, 90, 11, 0);

    let mut cover = RgbImage::from_pixel(600, 800, Rgb([245, 240, 230]));
    let x = (600 - barcode.width()) / 2;
    let y = 620;
    for (bx, by, pixel) in barcode.enumerate_pixels() {
        let v = pixel[0];
        cover.put_pixel(x + bx, y + by, Rgb([v, v, v]));
    }
    DynamicImage::ImageRgb8(cover)
}

/// Saves `image` as a PNG temp file; the file is removed when dropped.
pub fn save_temp_png(image: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    image
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Stand-in OCR engine returning canned text and counting calls.
#[derive(Clone)]
pub struct CannedOcr {
    pub text: &'static str,
    pub calls: Arc<AtomicUsize>,
}

impl CannedOcr {
    pub fn new(text: &'static str) -> Self {
        Self { text, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for CannedOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }

    fn name(&self) -> &str {
        "canned"
    }
}
