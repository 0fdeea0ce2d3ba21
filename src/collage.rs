//! Collage-mode run: assemble every image in a directory into one grid
//! sheet.
//!
//! Sources go through the shared pipeline base first, so the collage is
//! built from the same normalized images individual mode would produce.
//! The grid is near-square by default (`ceil(sqrt(N))` columns), every
//! cell is sized to the largest processed image, and the gutter is a
//! percentage of the cell size per axis. Output shaping and saving reuse
//! the individual-mode finish and save ladder.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::imaging::{filters, geometry};
use crate::individual::scan_inputs;
use crate::naming::{extension_lower, file_name_str, file_stem_str};
use crate::pipeline::{self, FinishParams};
use crate::save::{self, SaveError, SaveOptions};

/// Extensions accepted as collage sources, lowercase.
const SOURCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

#[derive(Debug, Error)]
pub enum CollageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input directory {path} is not accessible: {source}")]
    InputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("collage target {path} is an existing directory")]
    OutputIsDirectory { path: PathBuf },

    #[error("input directory {path} is not writable: {source}")]
    NotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no usable images found in {path}")]
    NoImages { path: PathBuf },

    #[error(transparent)]
    Save(#[from] SaveError),
}

#[derive(Debug)]
pub struct CollageSummary {
    /// Images placed on the sheet.
    pub used: usize,
    /// Sources that could not be read or decoded.
    pub skipped: usize,
    pub cols: u32,
    pub rows: u32,
    pub output: PathBuf,
    pub bytes: u64,
}

/// Build and save the collage described by `config`.
pub fn run(config: &Config) -> Result<CollageSummary, CollageError> {
    config.validate_collage()?;

    let input_dir = &config.paths.input_dir;
    let output = output_path(config);
    if output.is_dir() {
        return Err(CollageError::OutputIsDirectory { path: output });
    }
    probe_writable(input_dir)?;

    let sources = scan_sources(input_dir, &output)?;
    info!(count = sources.len(), dir = %input_dir.display(), "collecting collage sources");

    let mut images: Vec<RgbaImage> = Vec::new();
    let mut skipped = 0usize;
    for path in &sources {
        match image::open(path) {
            Ok(img) => images.push(pipeline::process_base(img.to_rgba8(), config)),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable source, excluded from collage");
                skipped += 1;
            }
        }
    }
    if images.is_empty() {
        return Err(CollageError::NoImages {
            path: input_dir.clone(),
        });
    }

    if config.collage_mode.proportional_placement {
        images = apply_placement_ratios(images, &config.collage_mode.placement_ratios);
    }

    let (cols, rows) = grid_shape(images.len(), config.collage_mode.forced_cols);
    let (cell_w, cell_h) = cell_size(&images);
    let (h_space, v_space) = gutter(cell_w, cell_h, config.collage_mode.spacing_percent);
    let canvas_w = cols * cell_w + (cols + 1) * h_space;
    let canvas_h = rows * cell_h + (rows + 1) * v_space;
    info!(cols, rows, cell_w, cell_h, canvas_w, canvas_h, "laying out grid");

    let mut sheet = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([0, 0, 0, 0]));
    for (i, img) in images.iter().enumerate() {
        let col = (i as u32) % cols;
        let row = (i as u32) / cols;
        let cell_x = h_space + col * (cell_w + h_space);
        let cell_y = v_space + row * (cell_h + v_space);
        let (w, h) = img.dimensions();
        let x = cell_x + (cell_w - w) / 2;
        let y = cell_y + (cell_h - h) / 2;
        image::imageops::overlay(&mut sheet, img, x as i64, y as i64);
    }

    let collage_cfg = &config.collage_mode;
    let mut sheet = filters::apply_brightness_contrast(sheet, collage_cfg.brightness, collage_cfg.contrast);
    sheet = pipeline::finish(sheet, &FinishParams::from(collage_cfg));

    let save_opts = SaveOptions {
        format: collage_cfg.format,
        jpeg_quality: collage_cfg.jpeg_quality,
        background: collage_cfg.background,
    };
    let bytes = save::save_image(&sheet, &output, &save_opts)?;
    info!(path = %output.display(), bytes, "collage saved");

    Ok(CollageSummary {
        used: images.len(),
        skipped,
        cols,
        rows,
        output,
        bytes,
    })
}

/// The collage lands next to its sources; the configured filename keeps
/// its stem but always takes the output format's extension.
pub fn output_path(config: &Config) -> PathBuf {
    let stem = file_stem_str(Path::new(&config.paths.collage_filename));
    config
        .paths
        .input_dir
        .join(stem)
        .with_extension(config.collage_mode.format.extension())
}

/// Grid shape for `n` images: forced column count, or the near-square
/// `ceil(sqrt(n))` layout.
pub fn grid_shape(n: usize, forced_cols: u32) -> (u32, u32) {
    let n = n as u32;
    let cols = if forced_cols > 0 {
        forced_cols.min(n).max(1)
    } else {
        (n as f64).sqrt().ceil() as u32
    };
    let rows = n.div_ceil(cols);
    (cols, rows)
}

/// Gutter in pixels per axis, as a percentage of the cell dimensions.
pub fn gutter(cell_w: u32, cell_h: u32, percent: f32) -> (u32, u32) {
    let space = |dim: u32| (dim as f32 * (percent / 100.0)).round() as u32;
    (space(cell_w), space(cell_h))
}

fn cell_size(images: &[RgbaImage]) -> (u32, u32) {
    let cell_w = images.iter().map(|i| i.width()).max().unwrap_or(1);
    let cell_h = images.iter().map(|i| i.height()).max().unwrap_or(1);
    (cell_w, cell_h)
}

/// Pre-scale each source toward `first-image size * ratio[i]`, keeping
/// aspect ratio. Ratios past the end of the list default to 1.0.
fn apply_placement_ratios(images: Vec<RgbaImage>, ratios: &[f32]) -> Vec<RgbaImage> {
    let Some(first) = images.first() else {
        return images;
    };
    let (base_w, base_h) = first.dimensions();
    images
        .into_iter()
        .enumerate()
        .map(|(i, img)| {
            let ratio = ratios.get(i).copied().unwrap_or(1.0);
            if ratio <= 0.0 {
                return img;
            }
            let box_w = ((base_w as f32 * ratio).round() as u32).max(1);
            let box_h = ((base_h as f32 * ratio).round() as u32).max(1);
            geometry::scale_to_fit(&img, box_w, box_h)
        })
        .collect()
}

fn scan_sources(dir: &Path, output: &Path) -> Result<Vec<PathBuf>, CollageError> {
    let files = scan_inputs(dir).map_err(|err| match err {
        crate::individual::IndividualError::InputDir { path, source } => {
            CollageError::InputDir { path, source }
        }
        other => CollageError::InputDir {
            path: dir.to_path_buf(),
            source: std::io::Error::other(other.to_string()),
        },
    })?;
    let output_name = file_name_str(output);
    Ok(files
        .into_iter()
        .filter(|p| SOURCE_EXTENSIONS.contains(&extension_lower(p).as_str()))
        .filter(|p| file_name_str(p) != output_name)
        .collect())
}

/// Fail early when the collage cannot be written where it must go.
fn probe_writable(dir: &Path) -> Result<(), CollageError> {
    let probe = dir.join(format!(".{}_write_probe", std::process::id()));
    match fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(source) => Err(CollageError::NotWritable {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
