//! OCR fallback: read printed ISBN text when no barcode decodes.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::config::OcrTarget;
use crate::detection::{preprocessing, region};
use crate::error::{Result, ScanError};
use crate::models::Isbn13;
use crate::pipeline::PipelineContext;
use crate::text;

/// An OCR engine: image in, best-effort text out.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs` (where `ocrs-cli` puts its models)
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two `ocrs` model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `text-detection.rten` and `text-recognition.rten` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn models_available(&self) -> bool {
        self.detection_model_path.exists() && self.recognition_model_path.exists()
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(ScanError::ModelNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "ocr")]
pub use engine::OcrsRecognizer;

#[cfg(feature = "ocr")]
mod engine {
    use super::*;
    use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
    use rten::Model;

    /// [`TextRecognizer`] backed by the `ocrs` neural OCR engine.
    ///
    /// Loading the models is the slow part; build one and reuse it.
    pub struct OcrsRecognizer {
        engine: OcrEngine,
    }

    impl OcrsRecognizer {
        #[instrument(skip_all, fields(
            detection = %config.detection_model_path.display(),
            recognition = %config.recognition_model_path.display(),
        ))]
        pub fn new(config: &OcrConfig) -> Result<Self> {
            config.validate()?;

            let detection_model = Model::load_file(&config.detection_model_path).map_err(|e| {
                ScanError::Ocr(format!(
                    "failed to load detection model from {}: {}",
                    config.detection_model_path.display(),
                    e
                ))
            })?;
            let recognition_model = Model::load_file(&config.recognition_model_path).map_err(|e| {
                ScanError::Ocr(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    e
                ))
            })?;

            let engine = OcrEngine::new(OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|e| ScanError::Ocr(format!("failed to initialise OCR engine: {}", e)))?;

            info!("OCR engine initialized");
            Ok(Self { engine })
        }

        /// Load models from the default cache directory
        pub fn with_defaults() -> Result<Self> {
            Self::new(&OcrConfig::default())
        }
    }

    impl TextRecognizer for OcrsRecognizer {
        fn recognize(&self, image: &DynamicImage) -> Result<String> {
            let rgb = image.to_rgb8();
            let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
                .map_err(|e| ScanError::Ocr(format!("failed to create image source: {}", e)))?;
            let input = self
                .engine
                .prepare_input(source)
                .map_err(|e| ScanError::Ocr(format!("OCR preprocessing failed: {}", e)))?;
            self.engine
                .get_text(&input)
                .map_err(|e| ScanError::Ocr(format!("OCR text recognition failed: {}", e)))
        }

        fn name(&self) -> &str {
            "ocrs"
        }
    }
}

/// Crop, threshold, OCR, then search the text for an ISBN.
///
/// Returns `Ok(None)` when no recognizer is configured or the engine fails
/// on this image; only debug-output I/O errors propagate.
#[instrument(skip_all)]
pub fn scan_isbn_text(image: &DynamicImage, context: &PipelineContext) -> Result<Option<Isbn13>> {
    let Some(recognizer) = context.recognizer.as_deref() else {
        debug!("No OCR engine configured, skipping text fallback");
        return Ok(None);
    };

    let config = &context.config;
    let crop = region::crop_isbn_region(image, &config.crop);
    debug!(kind = ?crop.kind, y = crop.bbox.y, height = crop.bbox.height, "ISBN region");
    context.save_debug("ocr_fallback", "crop", &crop.image)?;

    let source = match config.ocr_target {
        OcrTarget::FullImage => image,
        OcrTarget::Crop => &crop.image,
    };
    let gray = preprocessing::to_grayscale(source);
    let ocr_input = DynamicImage::ImageLuma8(preprocessing::binarize(&gray, config.binary_threshold));
    context.save_debug("ocr_fallback", "ocr_input", &ocr_input)?;

    let text = match recognizer.recognize(&ocr_input) {
        Ok(text) => text,
        Err(e) => {
            warn!(engine = recognizer.name(), error = %e, "OCR failed, treating as no text");
            return Ok(None);
        }
    };
    debug!(engine = recognizer.name(), chars = text.len(), lines = text.lines().count(), "OCR text recognized");

    Ok(text::extract_isbn_from_text(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::detection::ean::ScanlineDecoder;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    struct FixedText {
        text: &'static str,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl FixedText {
        fn new(text: &'static str) -> Self {
            Self { text, seen: Mutex::new(Vec::new()) }
        }
    }

    impl TextRecognizer for FixedText {
        fn recognize(&self, image: &DynamicImage) -> Result<String> {
            self.seen.lock().unwrap().push((image.width(), image.height()));
            Ok(self.text.to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    impl TextRecognizer for Broken {
        fn recognize(&self, _image: &DynamicImage) -> Result<String> {
            Err(ScanError::Ocr("engine exploded".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn cover() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([250, 250, 250])))
    }

    fn context_with(recognizer: Box<dyn TextRecognizer>, config: ScanConfig) -> PipelineContext {
        let mut context = PipelineContext::new(Box::new(ScanlineDecoder::new()));
        context.recognizer = Some(recognizer);
        context.config = config;
        context
    }

    #[test]
    fn text_fallback_finds_spaced_isbn() {
        let context = context_with(Box::new(FixedText::new("978 0 306 40615 7")), ScanConfig::default());
        let found = scan_isbn_text(&cover(), &context).unwrap();
        assert_eq!(found.map(Isbn13::into_string).as_deref(), Some("9780306406157"));
    }

    #[test]
    fn full_image_is_read_by_default() {
        let recognizer = std::sync::Arc::new(FixedText::new(""));
        let context = context_with(Box::new(SharedText(recognizer.clone())), ScanConfig::default());
        assert_eq!(scan_isbn_text(&cover(), &context).unwrap(), None);
        assert_eq!(*recognizer.seen.lock().unwrap(), vec![(300, 200)]);
    }

    #[test]
    fn crop_target_reads_bottom_band() {
        let recognizer = std::sync::Arc::new(FixedText::new(""));
        let config = ScanConfig::default().with_ocr_target(OcrTarget::Crop);
        let context = context_with(Box::new(SharedText(recognizer.clone())), config);
        scan_isbn_text(&cover(), &context).unwrap();
        assert_eq!(*recognizer.seen.lock().unwrap(), vec![(300, 70)]);
    }

    #[test]
    fn engine_failure_is_not_fatal() {
        let context = context_with(Box::new(Broken), ScanConfig::default());
        assert_eq!(scan_isbn_text(&cover(), &context).unwrap(), None);
    }

    #[test]
    fn no_engine_means_no_result() {
        let context = PipelineContext::new(Box::new(ScanlineDecoder::new()));
        assert_eq!(scan_isbn_text(&cover(), &context).unwrap(), None);
    }

    #[test]
    fn default_config_uses_known_filenames() {
        let config = OcrConfig::from_dir("/tmp/models");
        assert_eq!(config.detection_model_path, PathBuf::from("/tmp/models/text-detection.rten"));
        assert_eq!(config.recognition_model_path, PathBuf::from("/tmp/models/text-recognition.rten"));
        assert!(matches!(config.validate(), Err(ScanError::ModelNotFound(_))));
    }

    struct SharedText(std::sync::Arc<FixedText>);

    impl TextRecognizer for SharedText {
        fn recognize(&self, image: &DynamicImage) -> Result<String> {
            self.0.recognize(image)
        }

        fn name(&self) -> &str {
            "shared"
        }
    }
}
