//! Barcode decoding cascade: raw image, then grayscale, then a hard
//! threshold, stopping at the first ISBN.

use image::DynamicImage;
use tracing::{debug, instrument};

use crate::detection::preprocessing;
use crate::error::Result;
use crate::models::{has_bookland_prefix, DecodedBarcode, Isbn13, Symbology};
use crate::pipeline::PipelineContext;

/// A 1D barcode reader.
///
/// `symbologies` restricts the search when given; `None` means "anything
/// the decoder supports". Finding nothing is an empty list, not an error.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &DynamicImage, symbologies: Option<&[Symbology]>) -> Vec<DecodedBarcode>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Image variants tried by the cascade, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    /// Untouched input, EAN-13 only.
    Raw,
    Grayscale,
    /// Grayscale with a fixed binary threshold.
    Threshold,
}

impl ImageVariant {
    pub const CASCADE: [ImageVariant; 3] = [ImageVariant::Raw, ImageVariant::Grayscale, ImageVariant::Threshold];

    pub fn name(&self) -> &'static str {
        match self {
            ImageVariant::Raw => "raw",
            ImageVariant::Grayscale => "grayscale",
            ImageVariant::Threshold => "threshold",
        }
    }

    fn symbologies(&self) -> Option<&'static [Symbology]> {
        match self {
            ImageVariant::Raw => Some(&[Symbology::Ean13]),
            ImageVariant::Grayscale | ImageVariant::Threshold => None,
        }
    }
}

/// First decoded payload that is an ISBN-13: all digits, Bookland prefix,
/// valid check digit. Order of `decoded` is preserved.
pub fn isbn_from_barcodes(decoded: &[DecodedBarcode]) -> Option<Isbn13> {
    decoded
        .iter()
        .filter(|b| b.payload.bytes().all(|c| c.is_ascii_digit()) && has_bookland_prefix(&b.payload))
        .find_map(|b| Isbn13::parse(&b.payload))
}

/// Run the three-step cascade against `context.decoder`.
///
/// Each variant is built only when the previous one produced no ISBN.
#[instrument(skip_all, fields(decoder = context.decoder.name()))]
pub fn scan_barcode(image: &DynamicImage, context: &PipelineContext) -> Result<Option<Isbn13>> {
    let mut gray = None;

    for variant in ImageVariant::CASCADE {
        let candidate = match variant {
            ImageVariant::Raw => image.clone(),
            ImageVariant::Grayscale => {
                let luma = preprocessing::to_grayscale(image);
                gray = Some(luma.clone());
                DynamicImage::ImageLuma8(luma)
            }
            ImageVariant::Threshold => {
                let luma = match gray.take() {
                    Some(luma) => luma,
                    None => preprocessing::to_grayscale(image),
                };
                DynamicImage::ImageLuma8(preprocessing::binarize(&luma, context.config.binary_threshold))
            }
        };
        context.save_debug("barcode_cascade", variant.name(), &candidate)?;

        let decoded = context.decoder.decode(&candidate, variant.symbologies());
        debug!(variant = variant.name(), decoded = decoded.len(), "Barcode decode attempt");

        if let Some(isbn) = isbn_from_barcodes(&decoded) {
            debug!(variant = variant.name(), isbn = %isbn, "Barcode cascade found ISBN");
            return Ok(Some(isbn));
        }
    }

    Ok(None)
}
