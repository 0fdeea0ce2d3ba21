//! # Packshot
//!
//! Batch product-photo normalizer and grid collage builder. Point it at a
//! directory of product shots and every image goes through the same fixed
//! pipeline; a JSON settings file switches the individual steps on and off.
//!
//! # Architecture: One Pipeline, Two Run Modes
//!
//! ```text
//! scan input dir ─▶ per-image pipeline base ─┬─▶ per-file finish ─▶ output dir   (individual)
//!                                            └─▶ grid layout ─▶ sheet finish ─▶ collage file  (collage)
//! ```
//!
//! The pipeline base (pre-resize → whitening → background crop → padding →
//! tone) is shared verbatim between modes, so a collage is always built
//! from the same normalized images individual mode would emit. The finish
//! (aspect extension, downscale ceiling, exact canvas) runs per file in
//! individual mode and once on the assembled sheet in collage mode.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | JSON settings file: namespaced step toggles, defaults, validation |
//! | [`imaging`] | Pure image transforms — [`imaging::filters`] per-pixel, [`imaging::geometry`] size/canvas |
//! | [`pipeline`] | Step ordering and the config-driven decisions between steps |
//! | [`save`] | Verified persistence with a three-strategy fallback ladder |
//! | [`naming`] | Natural filename ordering (`img2` before `img10`) |
//! | [`rename`] | Two-phase article renaming of batch outputs |
//! | [`individual`] | Individual-mode orchestrator: scan, backup, process, save, delete, rename |
//! | [`collage`] | Collage-mode orchestrator: scan, process, grid layout, save |
//!
//! # Design Decisions
//!
//! ## RGBA Everywhere
//!
//! Every image is converted to RGBA8 on load and stays RGBA through the
//! whole pipeline. Background removal and padding need an alpha channel
//! anyway, and a single pixel type keeps the filters free of per-format
//! branches. Transparency is flattened onto the configured background
//! color only when encoding an opaque format (JPEG).
//!
//! ## Fail Per File, Never Per Batch
//!
//! A production batch regularly contains one truncated download or a stray
//! non-image. Both orchestrators classify failures per file (skipped =
//! unreadable, errored = unsavable) and keep going; only misconfiguration
//! and unusable directories abort a run. Post-pass actions with teeth —
//! deleting originals, article renaming — consume only the set of files
//! that fully succeeded.
//!
//! ## Pure-Rust Imaging
//!
//! All decoding, resampling (Lanczos3), and encoding goes through the
//! `image` crate with `default-features = false` and explicit format
//! features. No ImageMagick, no system libraries; the binary is fully
//! self-contained.
//!
//! ## Check Before You Crop
//!
//! The conditional padding modes (`if_white` / `if_not_white`) inspect the
//! image border, but the background crop removes exactly that border. The
//! pipeline therefore evaluates the perimeter check once, before cropping,
//! and carries the verdict forward to the padding step.

pub mod collage;
pub mod config;
pub mod imaging;
pub mod individual;
pub mod naming;
pub mod pipeline;
pub mod rename;
pub mod save;

#[cfg(test)]
pub(crate) mod test_helpers;
