//! Locate the barcode / ISBN text strip near the bottom of a back cover.
//!
//! The search is limited to the bottom band of the photo, where barcodes
//! sit on most back covers. It is a heuristic: when nothing barcode-like is
//! found the whole band is returned, so callers always get a usable region.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::detection::{contours, preprocessing};
use crate::models::{BoundingBox, Contour};

/// Tuning for [`crop_isbn_region`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParams {
    /// Fraction of the image height, counted from the bottom, to search.
    pub band_fraction: f64,
    /// Gaussian sigma applied before edge detection.
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Candidates must be more than this many times wider than tall.
    pub min_aspect_ratio: f32,
    /// Candidates must be wider than this fraction of the band.
    pub min_width_fraction: f32,
    /// Rows added above and below the chosen candidate.
    pub padding: u32,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            band_fraction: 0.35,
            // what a 5x5 kernel with automatic sigma works out to
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            min_aspect_ratio: 5.0,
            min_width_fraction: 0.4,
            padding: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CropKind {
    /// Strip around a wide, thin edge contour.
    Barcode,
    /// Nothing qualified; the whole bottom band.
    FullBand,
}

/// Result of [`crop_isbn_region`].
#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub image: DynamicImage,
    /// Where the crop sits in the source image.
    pub bbox: BoundingBox,
    pub kind: CropKind,
}

/// Keep contours shaped like a barcode: wide, thin and spanning a good part
/// of the band.
pub fn filter_barcode_candidates(
    contours: &[Contour],
    band_width: u32,
    params: &CropParams,
) -> Vec<Contour> {
    let min_width = band_width as f32 * params.min_width_fraction;
    contours
        .iter()
        .filter(|c| c.aspect_ratio() > params.min_aspect_ratio && c.width() as f32 > min_width)
        .cloned()
        .collect()
}

/// Pick the largest candidate and return the padded row span
/// `(top, bottom_exclusive)` inside a band of `band_height` rows.
pub fn select_barcode_rows(
    candidates: &[Contour],
    band_height: u32,
    params: &CropParams,
) -> Option<(u32, u32)> {
    // first of equal areas wins
    let best = candidates
        .iter()
        .rev()
        .max_by_key(|c| c.box_area())?;

    let top = best.min_y.saturating_sub(params.padding);
    let bottom = (best.min_y + best.height() + params.padding).min(band_height);
    Some((top, bottom))
}

/// Crop `img` to the strip most likely holding the barcode and ISBN text.
#[instrument(skip_all, fields(width = img.width(), height = img.height()))]
pub fn crop_isbn_region(img: &DynamicImage, params: &CropParams) -> RegionCrop {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return RegionCrop {
            image: img.clone(),
            bbox: BoundingBox { x: 0, y: 0, width, height },
            kind: CropKind::FullBand,
        };
    }

    let band_top = preprocessing::bottom_band_top(height, params.band_fraction);
    let band_height = height - band_top;
    let band = img.crop_imm(0, band_top, width, band_height);

    let gray = preprocessing::to_grayscale(&band);
    let blurred = preprocessing::apply_blur(&gray, params.blur_sigma);
    let edges = preprocessing::detect_edges(&blurred, params.canny_low, params.canny_high);
    let all_contours = contours::find_contours(&edges, 1);
    let candidates = filter_barcode_candidates(&all_contours, width, params);

    debug!(
        band_top,
        band_height,
        contours = all_contours.len(),
        candidates = candidates.len(),
        "Searched bottom band for barcode-shaped contours"
    );

    match select_barcode_rows(&candidates, band_height, params) {
        Some((top, bottom)) => {
            let bbox = BoundingBox {
                x: 0,
                y: band_top + top,
                width,
                height: bottom - top,
            };
            debug!(y = bbox.y, height = bbox.height, "Cropped to barcode strip");
            RegionCrop {
                image: band.crop_imm(0, top, width, bottom - top),
                bbox,
                kind: CropKind::Barcode,
            }
        }
        None => {
            debug!("No barcode-shaped contour, using whole band");
            RegionCrop {
                image: band,
                bbox: BoundingBox { x: 0, y: band_top, width, height: band_height },
                kind: CropKind::FullBand,
            }
        }
    }
}
