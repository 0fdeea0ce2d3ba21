//! Two-phase article renaming.
//!
//! After a batch run the outputs are renamed to the configured article
//! number: one file gets the bare `<article>.<ext>` name, the rest get
//! `<article>_1`, `<article>_2`, ... in natural source order. Renaming in
//! place would collide whenever an output already carries a target name
//! (processing `A.jpg` and `A_1.jpg` with article `A`), so the pass goes
//! through unique temp names first:
//!
//! 1. Every output is renamed to `__tmp_<pid>_<seq>_<stem>.<ext>`.
//! 2. The temp files are renamed to their final article names.
//!
//! A source file whose stem already equals the article (case-insensitive)
//! keeps the bare name; otherwise the first file in natural order gets it.
//! Individual rename failures are logged and counted, never fatal.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::naming::{extension_lower, file_name_str, file_stem_str, natural_cmp, sort_paths_naturally};

/// Prefix of phase-1 temp names. Directory scans must skip these so a
/// crashed earlier run cannot feed its leftovers back into the pipeline.
pub const TEMP_PREFIX: &str = "__tmp_";

/// Result of a rename pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    pub renamed: usize,
    pub failed: usize,
    /// Where the handled outputs actually ended up: the renamed targets
    /// plus any file a phase-1 failure left under its original name,
    /// natural-sorted. Callers must report these, not re-scan the
    /// directory, or bystander files get claimed as produced.
    pub final_paths: Vec<PathBuf>,
}

struct TempUnit {
    temp_path: PathBuf,
    original_stem: String,
    extension: String,
}

/// Rename `outputs` (files inside `dir`) to the article scheme. An empty
/// article or empty output list is a no-op.
pub fn apply_article_rename(dir: &Path, outputs: &[PathBuf], article: &str) -> RenameOutcome {
    let article = article.trim();
    if article.is_empty() || outputs.is_empty() {
        return RenameOutcome::default();
    }

    let mut sorted: Vec<&PathBuf> = outputs.iter().collect();
    sorted.sort_by(|a, b| natural_cmp(&file_name_str(a), &file_name_str(b)));

    let mut outcome = RenameOutcome::default();
    let pid = std::process::id();

    // Phase 1: move everything out of the way.
    let mut temps: Vec<TempUnit> = Vec::with_capacity(sorted.len());
    for (seq, path) in sorted.iter().enumerate() {
        let stem = file_stem_str(path);
        let extension = extension_lower(path);
        let temp_name = format!("{TEMP_PREFIX}{pid}_{seq:04}_{stem}.{extension}");
        let temp_path = dir.join(temp_name);
        match fs::rename(path, &temp_path) {
            Ok(()) => temps.push(TempUnit {
                temp_path,
                original_stem: stem,
                extension,
            }),
            Err(err) => {
                warn!(path = %path.display(), %err, "temp rename failed, file keeps its name");
                outcome.failed += 1;
                if path.exists() {
                    outcome.final_paths.push((*path).clone());
                }
            }
        }
    }

    // Phase 2: assign final names. The bare name goes to the file whose
    // stem already matches the article, else to the first in order.
    let bare_idx = temps
        .iter()
        .position(|t| t.original_stem.eq_ignore_ascii_case(article))
        .unwrap_or(0);

    let mut assigned: HashSet<String> = HashSet::new();
    let mut counter: u32 = 1;
    let order: Vec<usize> = std::iter::once(bare_idx)
        .chain((0..temps.len()).filter(|&i| i != bare_idx))
        .collect();

    let mut final_names: Vec<Option<String>> = vec![None; temps.len()];
    for (rank, &i) in order.iter().enumerate() {
        let unit = &temps[i];
        let name = if rank == 0 {
            let bare = format!("{article}.{}", unit.extension);
            if is_free(dir, &bare, &assigned) {
                bare
            } else {
                next_numbered(dir, article, &unit.extension, &mut counter, &assigned)
            }
        } else {
            next_numbered(dir, article, &unit.extension, &mut counter, &assigned)
        };
        assigned.insert(name.clone());
        final_names[i] = Some(name);
    }

    for (unit, name) in temps.iter().zip(final_names) {
        let Some(name) = name else { continue };
        let target = dir.join(&name);
        match fs::rename(&unit.temp_path, &target) {
            Ok(()) => {
                debug!(from = %unit.original_stem, to = %name, "renamed");
                outcome.renamed += 1;
                outcome.final_paths.push(target);
            }
            Err(err) => {
                warn!(path = %unit.temp_path.display(), %err, "final rename failed");
                outcome.failed += 1;
            }
        }
    }

    sort_paths_naturally(&mut outcome.final_paths);
    report_leftover_temps(dir);
    info!(
        renamed = outcome.renamed,
        failed = outcome.failed,
        article,
        "article rename pass finished"
    );
    outcome
}

fn next_numbered(
    dir: &Path,
    article: &str,
    extension: &str,
    counter: &mut u32,
    assigned: &HashSet<String>,
) -> String {
    loop {
        let candidate = format!("{article}_{counter}.{extension}");
        *counter += 1;
        if is_free(dir, &candidate, assigned) {
            return candidate;
        }
    }
}

/// Free means not on disk and not already handed out this pass.
fn is_free(dir: &Path, name: &str, assigned: &HashSet<String>) -> bool {
    !assigned.contains(name) && !dir.join(name).exists()
}

/// A temp file surviving the pass means a rename failed mid-way; make the
/// situation visible instead of silently leaving cryptic names around.
fn report_leftover_temps(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(TEMP_PREFIX) {
            warn!(file = %name, "leftover temp file from an incomplete rename");
        }
    }
}
