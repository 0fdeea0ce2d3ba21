//! Shared test utilities for the packshot test suite.
//!
//! Provides synthetic image constructors and on-disk fixture writers so
//! tests never depend on binary fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let img = with_opaque_rect(20, 20, 8, 9, 5, 4);
//! assert_eq!(img.get_pixel(8, 9)[3], 255);
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_png(&tmp.path().join("a.png"), &solid(10, 10, [255, 255, 255, 255]));
//! ```

use std::path::Path;

use image::{Rgba, RgbaImage};

// =========================================================================
// Synthetic image constructors
// =========================================================================

/// A `width` x `height` image filled with one RGBA color.
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// A solid `interior` image with a 1 px `border` ring.
pub fn with_border(width: u32, height: u32, border: [u8; 4], interior: [u8; 4]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            Rgba(border)
        } else {
            Rgba(interior)
        }
    })
}

/// A fully transparent image with an opaque gray rectangle at
/// `(rect_x, rect_y)` of size `rect_w` x `rect_h`.
pub fn with_opaque_rect(
    width: u32,
    height: u32,
    rect_x: u32,
    rect_y: u32,
    rect_w: u32,
    rect_h: u32,
) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= rect_x && x < rect_x + rect_w && y >= rect_y && y < rect_y + rect_h;
        if inside {
            Rgba([128, 128, 128, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

// =========================================================================
// On-disk fixtures
// =========================================================================

/// Write an image as PNG. Panics on failure (tests only).
pub fn write_png(path: &Path, img: &RgbaImage) {
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Write an image as JPEG, flattening alpha onto white. Panics on failure.
pub fn write_jpeg(path: &Path, img: &RgbaImage) {
    let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    rgb.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

/// Write a file with an image extension but unreadable content.
pub fn write_corrupt_image(path: &Path) {
    std::fs::write(path, b"not an image at all").unwrap();
}
