pub mod preprocessing;
pub mod contours;
pub mod region;
pub mod barcode;
pub mod ean;
pub mod ocr;

use image::DynamicImage;
use tracing::warn;

use crate::config::ScanConfig;
use crate::error::Result;
use crate::models::ExtractionResult;
use crate::pipeline::Pipeline;
use barcode::BarcodeDecoder;
use ocr::TextRecognizer;

pub const BARCODE_STRATEGY: &str = "barcode_cascade";
pub const OCR_STRATEGY: &str = "ocr_fallback";

/// Build the standard pipeline: barcode cascade, then OCR fallback.
///
/// Without a recognizer the OCR step is still listed but finds nothing.
pub fn build_standard_pipeline(
    decoder: Box<dyn BarcodeDecoder>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    config: ScanConfig,
) -> Pipeline {
    let pipeline = Pipeline::new(decoder)
        .with_config(config)
        .add_strategy(BARCODE_STRATEGY, barcode::scan_barcode)
        .add_strategy(OCR_STRATEGY, ocr::scan_isbn_text);

    match recognizer {
        Some(recognizer) => pipeline.with_recognizer(recognizer),
        None => pipeline,
    }
}

/// Default recognizer: `ocrs` with models from the cache directory, if the
/// feature is on and the models are there.
pub fn default_recognizer() -> Option<Box<dyn TextRecognizer>> {
    #[cfg(feature = "ocr")]
    {
        let config = ocr::OcrConfig::default();
        if !config.models_available() {
            warn!(dir = %ocr::default_model_dir().display(), "OCR models not found, text fallback disabled");
            return None;
        }
        match ocr::OcrsRecognizer::new(&config) {
            Ok(engine) => Some(Box::new(engine) as Box<dyn TextRecognizer>),
            Err(e) => {
                warn!(error = %e, "Could not start OCR engine, text fallback disabled");
                None
            }
        }
    }

    #[cfg(not(feature = "ocr"))]
    {
        warn!("Built without the `ocr` feature, text fallback disabled");
        None
    }
}

/// One-shot extraction with the built-in scan-line decoder and the default
/// recognizer.
///
/// Builds a fresh pipeline (and loads OCR models) on every call; keep a
/// [`Pipeline`] around when scanning many images.
pub fn extract_isbn(image: &DynamicImage) -> Result<ExtractionResult> {
    let pipeline = build_standard_pipeline(
        Box::new(ean::ScanlineDecoder::new()),
        default_recognizer(),
        ScanConfig::default(),
    );
    pipeline.run(image)
}
