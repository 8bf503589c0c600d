use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detection::region::CropParams;
use crate::error::{Result, ScanError};

/// Which image the OCR fallback reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrTarget {
    /// Thresholded copy of the whole photo. The region crop is still
    /// computed and logged.
    #[default]
    FullImage,
    /// Thresholded copy of the region crop only.
    Crop,
}

/// Tunables for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub crop: CropParams,
    /// Cutoff for the thresholded variants (pixel > cutoff is white).
    pub binary_threshold: u8,
    pub ocr_target: OcrTarget,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            crop: CropParams::default(),
            binary_threshold: 150,
            ocr_target: OcrTarget::FullImage,
        }
    }
}

impl ScanConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&raw)
            .map_err(|e| ScanError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: ScanConfig =
            serde_json::from_str(raw).map_err(|e| ScanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let crop = &self.crop;
        if !(crop.band_fraction > 0.0 && crop.band_fraction <= 1.0) {
            return Err(ScanError::Config(format!(
                "crop.band_fraction must be in (0, 1], got {}",
                crop.band_fraction
            )));
        }
        if crop.canny_low > crop.canny_high {
            return Err(ScanError::Config(format!(
                "crop.canny_low ({}) is above crop.canny_high ({})",
                crop.canny_low, crop.canny_high
            )));
        }
        if crop.blur_sigma <= 0.0 {
            return Err(ScanError::Config("crop.blur_sigma must be positive".to_string()));
        }
        Ok(())
    }

    pub fn with_ocr_target(mut self, target: OcrTarget) -> Self {
        self.ocr_target = target;
        self
    }
}
