mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from isbnscan for tests
pub use isbnscan::{
    build_standard_pipeline, ExtractionResult, Isbn13, OcrTarget, Pipeline, ScanConfig, ScanError,
    ScanlineDecoder, TextRecognizer,
};
