//! Recover ISBN-13s from photos of book covers.
//!
//! Barcode decoding is tried first (raw, grayscale, thresholded), then OCR
//! of the printed ISBN text. See [`Pipeline`] and
//! [`detection::build_standard_pipeline`].

pub mod checksum;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod text;

pub use config::{OcrTarget, ScanConfig};
pub use detection::{build_standard_pipeline, extract_isbn};
pub use detection::barcode::BarcodeDecoder;
pub use detection::ean::ScanlineDecoder;
pub use detection::ocr::{OcrConfig, TextRecognizer};
#[cfg(feature = "ocr")]
pub use detection::ocr::OcrsRecognizer;
pub use error::{Result, ScanError};
pub use models::{DecodedBarcode, ExtractionResult, Isbn13, IsbnCandidate, IsbnKind, Symbology};
pub use pipeline::{Pipeline, PipelineContext, Strategy};
