//! The per-image processing pipeline.
//!
//! Fixed step order, every step individually switchable from
//! configuration:
//!
//! 1. Pre-resize to the preprocessing ceiling (downscale only)
//! 2. Darkest-perimeter whitening
//! 3. White-background removal and transparent-border crop
//! 4. Conditional transparent padding
//! 5. Brightness/contrast
//! 6. Output shaping: aspect-ratio extension, final downscale ceiling,
//!    exact canvas
//!
//! Steps 1–5 form the shared base both run modes use; step 6 is the
//! per-mode finish (collage mode shapes the assembled sheet instead of
//! each source). The perimeter-whiteness check that conditional padding
//! consults is evaluated once, before cropping removes the border it
//! inspects.

use image::RgbaImage;
use tracing::debug;

use crate::config::{Config, PaddingMode};
use crate::imaging::filters::{self, CropMode};
use crate::imaging::geometry;

/// Output-shaping parameters for the pipeline finish, shared by both run
/// modes.
#[derive(Debug, Clone, Copy)]
pub struct FinishParams {
    pub force_aspect_ratio: Option<(u32, u32)>,
    /// Final downscale ceiling; 0 disables the axis.
    pub max_width: u32,
    pub max_height: u32,
    /// Exact output canvas; both must be > 0 to take effect.
    pub exact_width: u32,
    pub exact_height: u32,
}

impl From<&crate::config::IndividualConfig> for FinishParams {
    fn from(cfg: &crate::config::IndividualConfig) -> Self {
        Self {
            force_aspect_ratio: cfg.force_aspect_ratio,
            max_width: cfg.max_width,
            max_height: cfg.max_height,
            exact_width: cfg.exact_width,
            exact_height: cfg.exact_height,
        }
    }
}

impl From<&crate::config::CollageConfig> for FinishParams {
    fn from(cfg: &crate::config::CollageConfig) -> Self {
        Self {
            force_aspect_ratio: cfg.force_aspect_ratio,
            max_width: cfg.max_width,
            max_height: cfg.max_height,
            exact_width: cfg.exact_width,
            exact_height: cfg.exact_height,
        }
    }
}

/// Run the shared base of the pipeline (pre-resize through
/// brightness/contrast).
pub fn process_base(img: RgbaImage, config: &Config) -> RgbaImage {
    let mut img = img;

    if config.preprocessing.enabled {
        img = geometry::fit_within(
            img,
            axis_limit(config.preprocessing.max_width),
            axis_limit(config.preprocessing.max_height),
        );
    }

    if config.whitening.enabled {
        img = filters::whiten_by_darkest_perimeter(img, config.whitening.cancel_threshold_sum);
    }

    // The padding decision may depend on the border band, which the crop
    // below is about to remove. Evaluate it now, lazily.
    let perimeter_white = padding_needs_perimeter(config).then(|| {
        let tolerance = if config.background_crop.enabled {
            config.background_crop.white_tolerance
        } else {
            0
        };
        filters::check_perimeter_is_white(&img, tolerance, config.padding.perimeter_margin)
    });

    let pre_crop = img.dimensions();

    if config.background_crop.enabled {
        img = filters::remove_white_background(img, config.background_crop.white_tolerance);
        img = filters::crop_image(img, crop_mode(config));
    }

    if should_pad(config, perimeter_white) {
        let (w, h) = img.dimensions();
        let pad = filters::padding_pixels(w, h, config.padding.percent);
        let fits = w + 2 * pad <= pre_crop.0 && h + 2 * pad <= pre_crop.1;
        if pad > 0 && (config.padding.allow_expansion || fits) {
            img = filters::add_padding(img, config.padding.percent);
        } else if pad > 0 {
            debug!(
                pre_crop = ?pre_crop,
                "padding would exceed pre-crop size, skipped"
            );
        }
    }

    if config.brightness_contrast.enabled {
        img = filters::apply_brightness_contrast(
            img,
            config.brightness_contrast.brightness,
            config.brightness_contrast.contrast,
        );
    }

    img
}

/// Run the output-shaping finish: aspect extension, downscale ceiling,
/// exact canvas.
pub fn finish(img: RgbaImage, params: &FinishParams) -> RgbaImage {
    let mut img = img;
    if let Some((rw, rh)) = params.force_aspect_ratio {
        img = geometry::force_aspect_ratio(img, rw, rh);
    }
    if params.max_width > 0 || params.max_height > 0 {
        img = geometry::fit_within(img, axis_limit(params.max_width), axis_limit(params.max_height));
    }
    if params.exact_width > 0 && params.exact_height > 0 {
        img = geometry::exact_canvas(img, params.exact_width, params.exact_height);
    }
    img
}

/// Full pipeline for one file in individual mode.
pub fn process_individual(img: RgbaImage, config: &Config) -> RgbaImage {
    let img = process_base(img, config);
    finish(img, &FinishParams::from(&config.individual_mode))
}

fn axis_limit(configured: u32) -> u32 {
    if configured == 0 { u32::MAX } else { configured }
}

fn crop_mode(config: &Config) -> CropMode {
    if config.background_crop.symmetric_absolute {
        CropMode::SymmetricAbsolute
    } else if config.background_crop.symmetric_axes {
        CropMode::SymmetricAxes
    } else {
        CropMode::Standard
    }
}

fn padding_needs_perimeter(config: &Config) -> bool {
    config.padding.enabled
        && config.padding.perimeter_margin > 0
        && matches!(
            config.padding.mode,
            PaddingMode::IfWhite | PaddingMode::IfNotWhite
        )
}

fn should_pad(config: &Config, perimeter_white: Option<bool>) -> bool {
    if !config.padding.enabled || config.padding.percent <= 0.0 {
        return false;
    }
    match config.padding.mode {
        PaddingMode::Never => false,
        PaddingMode::Always => true,
        PaddingMode::IfWhite => perimeter_white.unwrap_or(false),
        PaddingMode::IfNotWhite => !perimeter_white.unwrap_or(false),
    }
}
