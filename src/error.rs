use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the scanning library.
///
/// "No ISBN in this image" is not an error; see
/// [`ExtractionResult::NotFound`](crate::models::ExtractionResult::NotFound).
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to decode image: {0}")]
    Load(#[from] image::ImageError),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR model not found at {}; run `ocrs-cli` once to download the models", .0.display())]
    ModelNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("not a valid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// `true` for the errors that mean the input image could not be read.
    pub fn is_load_error(&self) -> bool {
        matches!(self, ScanError::Open { .. } | ScanError::Load(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
