//! Run configuration module.
//!
//! Handles loading and validating the JSON settings file that both
//! orchestrators consume. Configuration is grouped into namespaces that
//! mirror the pipeline stages:
//!
//! ```text
//! paths               input/output/backup directories, collage filename
//! preprocessing       pre-resize ceiling applied before any filter
//! whitening           darkest-perimeter color correction
//! background_crop     white removal + transparent-border cropping
//! padding             conditional transparent padding
//! brightness_contrast per-image tone adjustment
//! individual_mode     per-file output shaping, format, renaming
//! collage_mode        grid layout and collage-level output shaping
//! ```
//!
//! ## Partial Configuration
//!
//! Settings files are sparse — every key has a default, and an absent key
//! simply leaves the corresponding step at its default (usually disabled).
//! A missing settings file is not an error; `Config::default()` is used.
//! Unknown keys are rejected to catch typos early.
//!
//! Validation runs once at the boundary, before any file is touched. Past
//! that point the configuration is read-only for the whole run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Output raster format. JPEG flattens transparency onto a background
/// color; PNG preserves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpg,
    Png,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// When the conditional padding step fires.
///
/// `IfWhite` and `IfNotWhite` consult the perimeter-whiteness check,
/// parameterized by `padding.perimeter_margin` and the background-crop
/// white tolerance. With a zero margin the check reads "not applicable"
/// (false), so `IfWhite` never pads and `IfNotWhite` always does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    Never,
    #[default]
    Always,
    IfWhite,
    IfNotWhite,
}

/// Directories and filenames the orchestrators read and write.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory scanned for source images (both modes).
    pub input_dir: PathBuf,
    /// Directory processed files are written to (individual mode).
    pub output_dir: PathBuf,
    /// Optional copy-before-processing directory (individual mode).
    /// Silently disabled when it coincides with input or output.
    pub backup_dir: Option<PathBuf>,
    /// Collage output filename; its extension is replaced by the
    /// configured format's extension.
    pub collage_filename: String,
}

/// Downscale-to-fit applied before any other step. Never upscales.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessingConfig {
    pub enabled: bool,
    /// Maximum width in pixels; 0 disables the width constraint.
    pub max_width: u32,
    /// Maximum height in pixels; 0 disables the height constraint.
    pub max_height: u32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_width: 2500,
            max_height: 2500,
        }
    }
}

/// Darkest-perimeter whitening settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WhiteningConfig {
    pub enabled: bool,
    /// Minimum R+G+B sum (0–765) of the darkest perimeter pixel required
    /// for whitening to run. Darker perimeters are left alone to avoid
    /// over-brightening.
    pub cancel_threshold_sum: u32,
}

impl Default for WhiteningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cancel_threshold_sum: 550,
        }
    }
}

/// White-background removal and transparent-border cropping.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundCropConfig {
    pub enabled: bool,
    /// 0 = only pure white becomes transparent, 255 = everything does.
    pub white_tolerance: u8,
    /// Center content per axis using that axis's own margin.
    pub symmetric_axes: bool,
    /// One shared margin on all four sides; takes priority over
    /// `symmetric_axes`.
    pub symmetric_absolute: bool,
}

/// Conditional transparent padding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaddingConfig {
    pub enabled: bool,
    /// Border size as a percentage of the larger image dimension.
    pub percent: f32,
    pub mode: PaddingMode,
    /// Border band width for the `if_white`/`if_not_white` perimeter check.
    pub perimeter_margin: u32,
    /// Allow padding to grow the image beyond its pre-crop size.
    pub allow_expansion: bool,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            percent: 5.0,
            mode: PaddingMode::Always,
            perimeter_margin: 0,
            allow_expansion: true,
        }
    }
}

/// Per-image brightness/contrast adjustment. Factor 1.0 is identity for
/// each axis independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrightnessContrastConfig {
    pub enabled: bool,
    pub brightness: f32,
    pub contrast: f32,
}

impl Default for BrightnessContrastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brightness: 1.0,
            contrast: 1.0,
        }
    }
}

/// Per-file mode: output shaping, format, deletion, and renaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndividualConfig {
    /// Article/SKU used by the two-phase rename pass; empty disables it.
    pub article: String,
    /// Delete successfully processed originals. Auto-disabled when input
    /// and output directories coincide.
    pub delete_originals: bool,
    /// Pad (never crop) to this W:H ratio, e.g. `[1, 1]`.
    pub force_aspect_ratio: Option<(u32, u32)>,
    /// Final downscale ceiling; 0 disables.
    pub max_width: u32,
    pub max_height: u32,
    /// Exact output canvas; both must be > 0 to take effect.
    pub exact_width: u32,
    pub exact_height: u32,
    pub format: OutputFormat,
    /// JPEG quality 1–100.
    pub jpeg_quality: u8,
    /// Background color transparency is flattened onto for JPEG output.
    pub background: [u8; 3],
}

impl Default for IndividualConfig {
    fn default() -> Self {
        Self {
            article: String::new(),
            delete_originals: false,
            force_aspect_ratio: None,
            max_width: 1500,
            max_height: 1500,
            exact_width: 0,
            exact_height: 0,
            format: OutputFormat::Jpg,
            jpeg_quality: 95,
            background: [255, 255, 255],
        }
    }
}

/// Collage mode: grid layout plus collage-level output shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollageConfig {
    /// Pre-scale sources toward per-index size ratios before layout.
    pub proportional_placement: bool,
    /// Target size ratios relative to the first image; indexes past the
    /// end of the list default to 1.0.
    pub placement_ratios: Vec<f32>,
    /// Grid columns; 0 = auto (`ceil(sqrt(N))`).
    pub forced_cols: u32,
    /// Gutter as a percentage of the cell dimension, per axis.
    pub spacing_percent: f32,
    pub force_aspect_ratio: Option<(u32, u32)>,
    pub max_width: u32,
    pub max_height: u32,
    pub exact_width: u32,
    pub exact_height: u32,
    pub format: OutputFormat,
    pub jpeg_quality: u8,
    pub background: [u8; 3],
    /// Collage-level tone adjustment; 1.0/1.0 leaves the collage alone.
    pub brightness: f32,
    pub contrast: f32,
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            proportional_placement: false,
            placement_ratios: vec![1.0],
            forced_cols: 0,
            spacing_percent: 2.0,
            force_aspect_ratio: None,
            max_width: 1500,
            max_height: 1500,
            exact_width: 0,
            exact_height: 0,
            format: OutputFormat::Jpg,
            jpeg_quality: 95,
            background: [255, 255, 255],
            brightness: 1.0,
            contrast: 1.0,
        }
    }
}

/// Complete run configuration, immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub preprocessing: PreprocessingConfig,
    pub whitening: WhiteningConfig,
    pub background_crop: BackgroundCropConfig,
    pub padding: PaddingConfig,
    pub brightness_contrast: BrightnessContrastConfig,
    pub individual_mode: IndividualConfig,
    pub collage_mode: CollageConfig,
}

impl Config {
    /// Load a settings file. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate the invariants shared by both modes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.input_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("input_dir is not set".into()));
        }
        if self.whitening.cancel_threshold_sum > 765 {
            return Err(ConfigError::Validation(format!(
                "whitening.cancel_threshold_sum must be 0-765, got {}",
                self.whitening.cancel_threshold_sum
            )));
        }
        for (label, quality) in [
            ("individual_mode", self.individual_mode.jpeg_quality),
            ("collage_mode", self.collage_mode.jpeg_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!(
                    "{label}.jpeg_quality must be 1-100, got {quality}"
                )));
            }
        }
        for (label, ratio) in [
            ("individual_mode", self.individual_mode.force_aspect_ratio),
            ("collage_mode", self.collage_mode.force_aspect_ratio),
        ] {
            if let Some((w, h)) = ratio
                && (w == 0 || h == 0)
            {
                return Err(ConfigError::Validation(format!(
                    "{label}.force_aspect_ratio components must be positive"
                )));
            }
        }
        for (label, percent) in [
            ("padding.percent", self.padding.percent),
            ("collage_mode.spacing_percent", self.collage_mode.spacing_percent),
        ] {
            if !(0.0..=100.0).contains(&percent) {
                return Err(ConfigError::Validation(format!(
                    "{label} must be 0-100, got {percent}"
                )));
            }
        }
        Ok(())
    }

    /// Additional checks for individual mode.
    pub fn validate_individual(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("output_dir is not set".into()));
        }
        Ok(())
    }

    /// Additional checks for collage mode.
    pub fn validate_collage(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.paths.collage_filename.trim().is_empty() {
            return Err(ConfigError::Validation(
                "collage_filename is not set".into(),
            ));
        }
        Ok(())
    }
}

/// Pretty-printed default settings file, for `packshot gen-config`.
pub fn stock_config_json() -> String {
    // Defaults always serialize
    serde_json::to_string_pretty(&Config::default()).unwrap_or_default()
}
