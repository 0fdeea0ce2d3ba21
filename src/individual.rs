//! Individual-mode batch run.
//!
//! Walks the input directory in natural order, pushes each image through
//! the pipeline, and writes the result to the output directory. One bad
//! file never stops the batch: unreadable inputs are counted as skipped,
//! save failures as errored, and the run continues. Original deletion and
//! article renaming run after the whole batch so a late failure cannot
//! leave a half-renamed directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::{Config, ConfigError};
use crate::naming::{extension_lower, file_name_str, file_stem_str, sort_paths_naturally};
use crate::pipeline;
use crate::rename::{self, RenameOutcome, TEMP_PREFIX};
use crate::save::{self, SaveOptions};

/// Extensions accepted as batch input, lowercase.
const INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif", "webp"];

#[derive(Debug, Error)]
pub enum IndividualError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input directory {path} is not accessible: {source}")]
    InputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Per-run bookkeeping returned to the caller.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Files that made it all the way to a verified output.
    pub processed: usize,
    /// Files that could not be read or decoded.
    pub skipped: usize,
    /// Files that failed after decoding (pipeline output could not be
    /// saved).
    pub errored: usize,
    /// Output paths in processing order, after any article rename.
    pub outputs: Vec<PathBuf>,
    pub rename: RenameOutcome,
}

/// Run the individual batch described by `config`.
pub fn run(config: &Config) -> Result<RunSummary, IndividualError> {
    config.validate_individual()?;

    let input_dir = &config.paths.input_dir;
    let output_dir = &config.paths.output_dir;
    fs::create_dir_all(output_dir).map_err(|source| IndividualError::OutputDir {
        path: output_dir.clone(),
        source,
    })?;

    let backup_dir = effective_backup_dir(config)?;
    let delete_originals =
        config.individual_mode.delete_originals && !same_path(input_dir, output_dir);
    if config.individual_mode.delete_originals && !delete_originals {
        warn!("input and output directories coincide, original deletion disabled");
    }

    let files = scan_inputs(input_dir)?;
    info!(count = files.len(), dir = %input_dir.display(), "starting batch");

    let save_opts = SaveOptions {
        format: config.individual_mode.format,
        jpeg_quality: config.individual_mode.jpeg_quality,
        background: config.individual_mode.background,
    };

    let mut summary = RunSummary::default();
    let mut deletable: Vec<PathBuf> = Vec::new();
    let total = files.len();

    for (index, path) in files.iter().enumerate() {
        info!("[{}/{}] {}", index + 1, total, file_name_str(path));

        if let Some(dir) = &backup_dir {
            let target = dir.join(file_name_str(path));
            if let Err(err) = fs::copy(path, &target) {
                warn!(path = %path.display(), %err, "backup copy failed, continuing");
            }
        }

        let img = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable image, skipped");
                summary.skipped += 1;
                continue;
            }
        };

        let result = pipeline::process_individual(img, config);
        let out_path = output_dir
            .join(file_stem_str(path))
            .with_extension(config.individual_mode.format.extension());
        match save::save_image(&result, &out_path, &save_opts) {
            Ok(bytes) => {
                info!(path = %out_path.display(), bytes, "saved");
                summary.processed += 1;
                summary.outputs.push(out_path);
                deletable.push(path.clone());
            }
            Err(err) => {
                warn!(path = %out_path.display(), %err, "save failed");
                summary.errored += 1;
            }
        }
    }

    if delete_originals {
        for path in &deletable {
            if let Err(err) = fs::remove_file(path) {
                warn!(path = %path.display(), %err, "could not delete original");
            }
        }
    }

    summary.rename = rename::apply_article_rename(
        output_dir,
        &summary.outputs,
        &config.individual_mode.article,
    );
    if summary.rename.renamed > 0 || summary.rename.failed > 0 {
        // Report where the outputs actually ended up. Files that already
        // lived in the output directory are not ours to claim.
        summary.outputs = summary.rename.final_paths.clone();
    }

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        errored = summary.errored,
        "batch finished"
    );
    Ok(summary)
}

/// Image files directly inside `dir`, natural-sorted. Dotfiles and temp
/// leftovers from interrupted rename passes are ignored.
pub fn scan_inputs(dir: &Path) -> Result<Vec<PathBuf>, IndividualError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| IndividualError::InputDir {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with(TEMP_PREFIX) {
            continue;
        }
        if INPUT_EXTENSIONS.contains(&extension_lower(entry.path()).as_str()) {
            files.push(entry.into_path());
        }
    }
    sort_paths_naturally(&mut files);
    Ok(files)
}

/// The backup directory, created, unless it coincides with the input or
/// output directory (backing up onto yourself is worse than no backup).
fn effective_backup_dir(config: &Config) -> Result<Option<PathBuf>, IndividualError> {
    let Some(dir) = &config.paths.backup_dir else {
        return Ok(None);
    };
    if same_path(dir, &config.paths.input_dir) || same_path(dir, &config.paths.output_dir) {
        warn!(dir = %dir.display(), "backup directory coincides with input/output, backup disabled");
        return Ok(None);
    }
    fs::create_dir_all(dir).map_err(|source| IndividualError::OutputDir {
        path: dir.clone(),
        source,
    })?;
    Ok(Some(dir.clone()))
}

/// Path equality that survives `./in` vs `in` vs symlinks where possible.
fn same_path(a: &Path, b: &Path) -> bool {
    let resolve = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    resolve(a) == resolve(b)
}
