use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::config::ScanConfig;
use crate::detection::barcode::BarcodeDecoder;
use crate::detection::ocr::TextRecognizer;
use crate::error::{Result, ScanError};
use crate::models::{ExtractionResult, Isbn13};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Everything a strategy may use: tunables and the external engines.
pub struct PipelineContext {
    pub config: ScanConfig,
    pub decoder: Box<dyn BarcodeDecoder>,
    /// `None` disables the OCR fallback.
    pub recognizer: Option<Box<dyn TextRecognizer>>,
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    pub fn new(decoder: Box<dyn BarcodeDecoder>) -> Self {
        Self {
            config: ScanConfig::default(),
            decoder,
            recognizer: None,
            debug: None,
        }
    }

    /// Save an intermediate image as `<output_dir>/<stage>/<variant>.png`
    /// when debug mode is on. No-op otherwise.
    pub fn save_debug(&self, stage: &str, variant: &str, image: &DynamicImage) -> Result<()> {
        let Some(debug_config) = &self.debug else {
            return Ok(());
        };
        if !debug_config.enabled {
            return Ok(());
        }

        let stage_dir_name = stage.to_lowercase().replace(' ', "_");
        let stage_dir = debug_config.output_dir.join(&stage_dir_name);
        std::fs::create_dir_all(&stage_dir)?;

        let filename = format!("{}.png", variant);
        image
            .save(stage_dir.join(&filename))
            .map_err(|e| ScanError::Io(std::io::Error::other(format!("failed to save debug image: {}", e))))?;

        debug!(path = %format!("{}/{}", stage_dir_name, filename), "Saved debug image");
        Ok(())
    }
}

/// One detection strategy: a plain function from image to maybe-ISBN.
pub type StrategyFn = fn(&DynamicImage, &PipelineContext) -> Result<Option<Isbn13>>;

#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: StrategyFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Ordered list of strategies; the first one that yields an ISBN wins.
///
/// A pipeline holds no per-call state, so a single instance can serve many
/// images, from several threads at once.
pub struct Pipeline {
    strategies: Vec<Strategy>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a pipeline with no strategies
    pub fn new(decoder: Box<dyn BarcodeDecoder>) -> Self {
        Self {
            strategies: Vec::new(),
            context: PipelineContext::new(decoder),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.context.config = config;
        self
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.context.recognizer = Some(recognizer);
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(ScanError::Config(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    /// Append a strategy; strategies run in insertion order
    pub fn add_strategy(mut self, name: &'static str, run: StrategyFn) -> Self {
        self.strategies.push(Strategy { name, run });
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Run every strategy in order until one finds an ISBN.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn run(&self, image: &DynamicImage) -> Result<ExtractionResult> {
        self.context.save_debug("00_input", "01", image)?;

        for strategy in &self.strategies {
            debug!(strategy = strategy.name, "Running strategy");
            if let Some(isbn) = (strategy.run)(image, &self.context)? {
                info!(strategy = strategy.name, isbn = %isbn, "ISBN found");
                return Ok(ExtractionResult::Found(isbn));
            }
            debug!(strategy = strategy.name, "Strategy found nothing");
        }

        info!("No ISBN found");
        Ok(ExtractionResult::NotFound)
    }

    /// Decode the image at `path` and run the pipeline on it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn extract_from_path(&self, path: impl AsRef<Path>) -> Result<ExtractionResult> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| ScanError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(width = image.width(), height = image.height(), "Image loaded");
        self.run(&image)
    }

    /// Decode an encoded image (PNG, JPEG, ...) from memory and run the
    /// pipeline on it.
    #[instrument(skip_all, fields(len = bytes.len()))]
    pub fn extract_from_bytes(&self, bytes: &[u8]) -> Result<ExtractionResult> {
        let image = image::load_from_memory(bytes)?;
        self.run(&image)
    }
}
