//! Verified image persistence.
//!
//! Saving is the step most exposed to flaky environments (network shares,
//! antivirus interception, full disks), so it runs a ladder of strategies
//! and verifies each result on disk before trusting it:
//!
//! 1. Encode straight into the destination file.
//! 2. Encode into a private temp directory, then copy to the destination.
//! 3. Encode into memory, then write the bytes in one call.
//!
//! A save counts as successful only when the destination exists with a
//! nonzero size; the verified byte size is returned. When every strategy
//! fails, any zero-byte artifact left at the destination is removed.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::OutputFormat;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("refusing to save empty image ({width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to encode image for {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("all save strategies failed for {path}")]
    Exhausted { path: PathBuf },
}

/// How to encode the final image.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub format: OutputFormat,
    /// JPEG quality, 1-100. Ignored for PNG.
    pub jpeg_quality: u8,
    /// Background color transparency is flattened onto for opaque formats.
    pub background: [u8; 3],
}

/// Save with the fallback ladder and return the verified file size in
/// bytes.
pub fn save_image(img: &RgbaImage, path: &Path, opts: &SaveOptions) -> Result<u64, SaveError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(SaveError::InvalidDimensions { width, height });
    }

    match save_direct(img, path, opts) {
        Ok(size) => return Ok(size),
        Err(err) => warn!(path = %path.display(), %err, "direct save failed, trying temp copy"),
    }
    match save_via_temp(img, path, opts) {
        Ok(size) => return Ok(size),
        Err(err) => warn!(path = %path.display(), %err, "temp-copy save failed, trying in-memory encode"),
    }
    match save_from_memory(img, path, opts) {
        Ok(size) => return Ok(size),
        Err(err) => warn!(path = %path.display(), %err, "in-memory save failed"),
    }

    // Do not leave an empty file behind for a downstream tool to trip on.
    if let Ok(meta) = fs::metadata(path)
        && meta.len() == 0
        && fs::remove_file(path).is_ok()
    {
        debug!(path = %path.display(), "removed zero-byte artifact");
    }
    Err(SaveError::Exhausted {
        path: path.to_path_buf(),
    })
}

fn save_direct(img: &RgbaImage, path: &Path, opts: &SaveOptions) -> Result<u64, SaveError> {
    let file = fs::File::create(path).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    encode(img, BufWriter::new(file), opts).map_err(|source| SaveError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    verify(path)
}

fn save_via_temp(img: &RgbaImage, path: &Path, opts: &SaveOptions) -> Result<u64, SaveError> {
    let io_err = |source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tmp_dir = tempfile::tempdir().map_err(io_err)?;
    let tmp_path = tmp_dir.path().join(crate::naming::file_name_str(path));
    let file = fs::File::create(&tmp_path).map_err(io_err)?;
    encode(img, BufWriter::new(file), opts).map_err(|source| SaveError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::copy(&tmp_path, path).map_err(io_err)?;
    verify(path)
}

fn save_from_memory(img: &RgbaImage, path: &Path, opts: &SaveOptions) -> Result<u64, SaveError> {
    let mut bytes = Vec::new();
    encode(img, &mut bytes, opts).map_err(|source| SaveError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, &bytes).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    verify(path)
}

fn encode<W: std::io::Write>(
    img: &RgbaImage,
    writer: W,
    opts: &SaveOptions,
) -> Result<(), image::ImageError> {
    let (width, height) = img.dimensions();
    match opts.format {
        OutputFormat::Jpg => {
            let rgb = flatten_onto(img, opts.background);
            JpegEncoder::new_with_quality(writer, opts.jpeg_quality).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Png => PngEncoder::new(writer).write_image(
            img.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    }
}

/// Composite transparency onto a solid background color.
pub fn flatten_onto(img: &RgbaImage, background: [u8; 3]) -> RgbImage {
    let (width, height) = img.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let p = img.get_pixel(x, y);
        let alpha = p[3] as u32;
        let blend = |c: u8, bg: u8| ((c as u32 * alpha + bg as u32 * (255 - alpha)) / 255) as u8;
        image::Rgb([
            blend(p[0], background[0]),
            blend(p[1], background[1]),
            blend(p[2], background[2]),
        ])
    })
}

fn verify(path: &Path) -> Result<u64, SaveError> {
    let meta = fs::metadata(path).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.len() == 0 {
        return Err(SaveError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other("file exists but is empty"),
        });
    }
    Ok(meta.len())
}
