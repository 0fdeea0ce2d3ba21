//! Stateless per-image filters.
//!
//! Every function takes ownership of its input buffer and returns a new
//! (or the unchanged) owned buffer — no I/O, no shared state. Images are
//! RGBA throughout; output channel modes are applied at save time.

use image::{Rgba, RgbaImage};
use tracing::debug;

/// Border-crop policy for [`crop_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    /// Crop to the exact bounding box of non-transparent pixels.
    Standard,
    /// Box centered on the bounding box's center, extended to the maximum
    /// reach toward the image edges along each axis independently.
    SymmetricAxes,
    /// One shared margin — the minimum distance from any bounding-box edge
    /// to the corresponding image edge — applied on all four sides.
    SymmetricAbsolute,
}

/// Whiten using the darkest perimeter pixel (1 px border) as the white
/// reference.
///
/// Skipped (input returned unchanged) when the image is ≤ 1 px in either
/// dimension, when the darkest pixel's R+G+B sum falls below
/// `cancel_threshold_sum` (background already too dark — whitening would
/// over-brighten), or when the darkest pixel is already pure white.
/// Transparency is preserved untouched.
pub fn whiten_by_darkest_perimeter(img: RgbaImage, cancel_threshold_sum: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width <= 1 || height <= 1 {
        debug!("image too small for perimeter analysis, whitening skipped");
        return img;
    }

    let mut darkest: [u8; 3] = [255, 255, 255];
    let mut min_sum = u32::MAX;
    for (x, y) in perimeter_coords(width, height) {
        let p = img.get_pixel(x, y);
        let sum = p[0] as u32 + p[1] as u32 + p[2] as u32;
        if sum < min_sum {
            min_sum = sum;
            darkest = [p[0], p[1], p[2]];
        }
    }

    if min_sum < cancel_threshold_sum {
        debug!(
            min_sum,
            cancel_threshold_sum, "darkest perimeter pixel below threshold, whitening cancelled"
        );
        return img;
    }
    if darkest == [255, 255, 255] {
        debug!("darkest perimeter pixel already white, whitening not needed");
        return img;
    }

    // Per-channel multiplicative lookup, clamped to 255.
    let lut: [[u8; 256]; 3] = std::array::from_fn(|c| {
        let scale = 255.0 / f32::from(darkest[c]).max(1.0);
        std::array::from_fn(|v| (v as f32 * scale).round().min(255.0) as u8)
    });

    let mut out = img;
    for Rgba([r, g, b, _a]) in out.pixels_mut() {
        *r = lut[0][*r as usize];
        *g = lut[1][*g as usize];
        *b = lut[2][*b as usize];
    }
    debug!(reference = ?darkest, "whitening applied");
    out
}

/// Turn white and near-white pixels fully transparent.
///
/// A pixel qualifies when all of R, G, B are ≥ `255 - tolerance` and its
/// alpha is nonzero. Tolerance 0 clears only pure white; 255 clears
/// everything opaque.
pub fn remove_white_background(img: RgbaImage, tolerance: u8) -> RgbaImage {
    let cutoff = 255 - tolerance;
    let mut out = img;
    let mut cleared = 0usize;
    for Rgba([r, g, b, a]) in out.pixels_mut() {
        if *a > 0 && *r >= cutoff && *g >= cutoff && *b >= cutoff {
            *a = 0;
            cleared += 1;
        }
    }
    if cleared > 0 {
        debug!(cleared, tolerance, "background pixels made transparent");
    }
    out
}

/// Crop transparent borders, keeping a 1 px margin around the content.
///
/// The content box is the bounding box of pixels with nonzero alpha; with
/// no such pixels the image is returned unchanged. The selected box gets a
/// 1 px padding clamped to the image bounds, and the crop is skipped when
/// that final box covers the whole image.
pub fn crop_image(img: RgbaImage, mode: CropMode) -> RgbaImage {
    let (width, height) = img.dimensions();
    let Some((left, top, right, bottom)) = opaque_bounding_box(&img) else {
        debug!("no non-transparent pixels, cropping skipped");
        return img;
    };

    // Exclusive right/bottom from here on.
    let (mut crop_l, mut crop_t, mut crop_r, mut crop_b) = (left, top, right + 1, bottom + 1);

    match mode {
        CropMode::Standard => {}
        CropMode::SymmetricAbsolute => {
            let min_dist = [left, top, width - crop_r, height - crop_b]
                .into_iter()
                .min()
                .unwrap_or(0);
            let (l, t, r, b) = (min_dist, min_dist, width - min_dist, height - min_dist);
            if l < r && t < b {
                (crop_l, crop_t, crop_r, crop_b) = (l, t, r, b);
            }
        }
        CropMode::SymmetricAxes => {
            let cx = (crop_l + crop_r) as f32 / 2.0;
            let cy = (crop_t + crop_b) as f32 / 2.0;
            let reach_x = cx.max(width as f32 - cx);
            let reach_y = cy.max(height as f32 - cy);
            let l = (cx - reach_x).max(0.0) as u32;
            let t = (cy - reach_y).max(0.0) as u32;
            let r = ((cx + reach_x).ceil() as u32).min(width);
            let b = ((cy + reach_y).ceil() as u32).min(height);
            if l < r && t < b {
                (crop_l, crop_t, crop_r, crop_b) = (l, t, r, b);
            }
        }
    }

    // 1 px breathing room, clamped to the image.
    let final_l = crop_l.saturating_sub(1);
    let final_t = crop_t.saturating_sub(1);
    let final_r = (crop_r + 1).min(width);
    let final_b = (crop_b + 1).min(height);

    if (final_l, final_t, final_r, final_b) == (0, 0, width, height) {
        debug!("crop box matches image size, cropping not needed");
        return img;
    }

    let cropped = image::imageops::crop_imm(&img, final_l, final_t, final_r - final_l, final_b - final_t)
        .to_image();
    debug!(
        from = ?(width, height),
        to = ?cropped.dimensions(),
        "cropped transparent borders"
    );
    cropped
}

/// Check whether a `margin`-pixel border band reads as white.
///
/// Transparency is composited onto a simulated white background before
/// checking. `margin <= 0` means the check is not applicable and returns
/// false; otherwise the margin is clamped to half of each dimension (at
/// least 1 px). Returns true only when every band pixel has all channels
/// ≥ `255 - tolerance`.
pub fn check_perimeter_is_white(img: &RgbaImage, tolerance: u8, margin: u32) -> bool {
    if margin == 0 {
        debug!("perimeter check skipped (margin is zero)");
        return false;
    }
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return false;
    }

    let margin_w = (margin.min(width / 2)).max(1);
    let margin_h = (margin.min(height / 2)).max(1);
    let cutoff = 255 - tolerance;

    let white_enough = |x: u32, y: u32| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        // Composite onto white: out = c * a/255 + 255 * (1 - a/255)
        let alpha = a as u32;
        let on_white = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        on_white(r) >= cutoff && on_white(g) >= cutoff && on_white(b) >= cutoff
    };

    // Top and bottom bands at full width, then the remaining left/right
    // columns (corners counted once).
    for y in (0..margin_h).chain(height - margin_h..height) {
        for x in 0..width {
            if !white_enough(x, y) {
                return false;
            }
        }
    }
    for x in (0..margin_w).chain(width - margin_w..width) {
        for y in margin_h..height - margin_h {
            if !white_enough(x, y) {
                return false;
            }
        }
    }
    true
}

/// Number of padding pixels a given percentage adds around an image of the
/// given size.
pub fn padding_pixels(width: u32, height: u32, percent: f32) -> u32 {
    (width.max(height) as f32 * (percent / 100.0)).round() as u32
}

/// Add a uniform transparent border sized as a percentage of the larger
/// dimension. Zero computed pixels is a no-op.
pub fn add_padding(img: RgbaImage, percent: f32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let pad = padding_pixels(width, height, percent);
    if pad == 0 {
        debug!("padding skipped (zero pixels)");
        return img;
    }
    let mut canvas = RgbaImage::from_pixel(width + 2 * pad, height + 2 * pad, Rgba([0, 0, 0, 0]));
    image::imageops::overlay(&mut canvas, &img, pad as i64, pad as i64);
    debug!(
        from = ?(width, height),
        to = ?canvas.dimensions(),
        "padding applied"
    );
    canvas
}

/// Multiply luminance by `brightness`, then spread values around mid-gray
/// by `contrast`. 1.0 is identity for each factor independently; alpha is
/// untouched.
pub fn apply_brightness_contrast(img: RgbaImage, brightness: f32, contrast: f32) -> RgbaImage {
    if brightness == 1.0 && contrast == 1.0 {
        return img;
    }
    let lut: [u8; 256] = std::array::from_fn(|v| {
        let brightened = v as f32 * brightness;
        ((brightened - 128.0) * contrast + 128.0).round().clamp(0.0, 255.0) as u8
    });
    let mut out = img;
    for Rgba([r, g, b, _a]) in out.pixels_mut() {
        *r = lut[*r as usize];
        *g = lut[*g as usize];
        *b = lut[*b as usize];
    }
    out
}

/// Coordinates of the 1 px border ring, corners visited once.
fn perimeter_coords(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top = (0..width).map(move |x| (x, 0));
    let bottom = (0..width).map(move |x| (x, height - 1)).filter(move |_| height > 1);
    let left = (1..height.saturating_sub(1)).map(move |y| (0, y));
    let right = (1..height.saturating_sub(1))
        .map(move |y| (width - 1, y))
        .filter(move |_| width > 1);
    top.chain(bottom).chain(left).chain(right)
}

/// Inclusive bounding box `(left, top, right, bottom)` of pixels with
/// nonzero alpha, or `None` when the image is fully transparent.
fn opaque_bounding_box(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let (mut left, mut top) = (u32::MAX, u32::MAX);
    let (mut right, mut bottom) = (0u32, 0u32);
    let mut found = false;
    for (x, y, p) in img.enumerate_pixels() {
        if p[3] > 0 {
            found = true;
            left = left.min(x);
            right = right.max(x);
            top = top.min(y);
            bottom = bottom.max(y);
        }
    }
    found.then_some((left, top, right, bottom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{solid, with_border, with_opaque_rect};

    // =========================================================================
    // Whitening
    // =========================================================================

    #[test]
    fn whiten_scales_gray_border_to_white() {
        // 200-gray border, mid pixel darker
        let img = with_border(9, 9, [200, 200, 200, 255], [100, 100, 100, 255]);
        let out = whiten_by_darkest_perimeter(img, 0);
        // Border reference (200,200,200) maps to pure white
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        // Interior scales by the same factor: 100 * 255/200 = 127.5 → 128
        assert_eq!(out.get_pixel(4, 4), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn whiten_is_identity_when_perimeter_already_white() {
        let img = with_border(8, 8, [255, 255, 255, 255], [90, 120, 30, 255]);
        let before = img.clone();
        let out = whiten_by_darkest_perimeter(img, 0);
        assert_eq!(out, before);
    }

    #[test]
    fn whiten_cancelled_below_threshold() {
        // Darkest perimeter sum is 3 * 100 = 300, below the 550 default
        let img = solid(10, 10, [100, 100, 100, 255]);
        let before = img.clone();
        let out = whiten_by_darkest_perimeter(img, 550);
        assert_eq!(out, before);
    }

    #[test]
    fn whiten_runs_at_exactly_the_threshold() {
        let img = solid(10, 10, [200, 200, 200, 255]);
        let out = whiten_by_darkest_perimeter(img, 600);
        assert_eq!(out.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn whiten_skips_degenerate_images() {
        let img = solid(1, 5, [10, 10, 10, 255]);
        let before = img.clone();
        assert_eq!(whiten_by_darkest_perimeter(img, 0), before);
    }

    #[test]
    fn whiten_preserves_alpha() {
        let img = solid(6, 6, [200, 200, 200, 77]);
        let out = whiten_by_darkest_perimeter(img, 0);
        assert_eq!(out.get_pixel(3, 3)[3], 77);
    }

    // =========================================================================
    // Background removal
    // =========================================================================

    #[test]
    fn removal_tolerance_zero_clears_only_pure_white() {
        let mut img = solid(4, 1, [255, 255, 255, 255]);
        img.put_pixel(1, 0, Rgba([254, 255, 255, 255]));
        let out = remove_white_background(img, 0);
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(1, 0)[3], 255);
    }

    #[test]
    fn removal_tolerance_255_clears_everything_opaque() {
        let img = solid(3, 3, [0, 10, 20, 255]);
        let out = remove_white_background(img, 255);
        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn removal_skips_already_transparent_pixels() {
        let img = solid(2, 2, [255, 255, 255, 0]);
        let before = img.clone();
        assert_eq!(remove_white_background(img, 10), before);
    }

    #[test]
    fn removal_is_monotonic_in_tolerance() {
        let img = with_border(12, 12, [250, 250, 250, 255], [128, 128, 128, 255]);
        let low = remove_white_background(img.clone(), 3);
        let high = remove_white_background(img, 30);
        for (l, h) in low.pixels().zip(high.pixels()) {
            if l[3] == 0 {
                assert_eq!(h[3], 0, "transparent at t1 must stay transparent at t2");
            }
        }
    }

    // =========================================================================
    // Cropping
    // =========================================================================

    #[test]
    fn crop_standard_size_is_bbox_plus_one_pixel_margin() {
        // 20x20 transparent, opaque 5x4 rect at (8, 9)
        let img = with_opaque_rect(20, 20, 8, 9, 5, 4);
        let out = crop_image(img, CropMode::Standard);
        assert_eq!(out.dimensions(), (7, 6));
    }

    #[test]
    fn crop_margin_clamps_at_image_edge() {
        let img = with_opaque_rect(10, 10, 0, 0, 4, 4);
        let out = crop_image(img, CropMode::Standard);
        // 1 px margin only on the far sides
        assert_eq!(out.dimensions(), (5, 5));
    }

    #[test]
    fn crop_fully_transparent_is_unchanged() {
        let img = solid(6, 8, [0, 0, 0, 0]);
        let before = img.clone();
        assert_eq!(crop_image(img, CropMode::Standard), before);
    }

    #[test]
    fn crop_fully_opaque_is_unchanged() {
        let img = solid(6, 8, [10, 20, 30, 255]);
        let before = img.clone();
        assert_eq!(crop_image(img, CropMode::Standard), before);
    }

    #[test]
    fn crop_symmetric_absolute_centers_content() {
        // 30x30, opaque 4x4 at (10, 12): margins L=10, T=12, R=16, B=14 → min 10
        let img = with_opaque_rect(30, 30, 10, 12, 4, 4);
        let out = crop_image(img, CropMode::SymmetricAbsolute);
        // Shared margin 10 minus 1 px breathing room on each side
        assert_eq!(out.dimensions(), (12, 12));
        // Content distances to each edge must be equal within 1 px
        let (l, t, r, b) = opaque_bounding_box(&out).unwrap();
        let (w, h) = out.dimensions();
        let dists = [l, t, w - 1 - r, h - 1 - b];
        let min = dists.iter().min().unwrap();
        let max = dists.iter().max().unwrap();
        assert!(max - min <= 1, "margins {dists:?} differ by more than 1px");
    }

    #[test]
    fn crop_symmetric_axes_spans_the_full_image() {
        // Reach is measured to the image edges, so the axes box always
        // covers the image and the crop is a no-op.
        let img = with_opaque_rect(20, 16, 2, 3, 5, 5);
        let out = crop_image(img, CropMode::SymmetricAxes);
        assert_eq!(out.dimensions(), (20, 16));
    }

    // =========================================================================
    // Perimeter check
    // =========================================================================

    #[test]
    fn perimeter_white_on_white_border() {
        let img = with_border(10, 10, [255, 255, 255, 255], [0, 0, 0, 255]);
        assert!(check_perimeter_is_white(&img, 0, 1));
    }

    #[test]
    fn perimeter_not_white_with_dark_corner() {
        let mut img = solid(10, 10, [255, 255, 255, 255]);
        img.put_pixel(9, 9, Rgba([10, 10, 10, 255]));
        assert!(!check_perimeter_is_white(&img, 0, 1));
    }

    #[test]
    fn perimeter_transparency_reads_as_white() {
        let img = solid(10, 10, [0, 0, 0, 0]);
        assert!(check_perimeter_is_white(&img, 0, 2));
    }

    #[test]
    fn perimeter_zero_margin_is_not_applicable() {
        let img = solid(10, 10, [255, 255, 255, 255]);
        assert!(!check_perimeter_is_white(&img, 0, 0));
    }

    #[test]
    fn perimeter_tolerance_admits_near_white() {
        let img = solid(10, 10, [250, 250, 250, 255]);
        assert!(!check_perimeter_is_white(&img, 0, 1));
        assert!(check_perimeter_is_white(&img, 10, 1));
    }

    #[test]
    fn perimeter_margin_clamped_to_half_dimension() {
        // margin 50 on a 6x6 white image must not walk out of bounds
        let img = solid(6, 6, [255, 255, 255, 255]);
        assert!(check_perimeter_is_white(&img, 0, 50));
    }

    // =========================================================================
    // Padding
    // =========================================================================

    #[test]
    fn padding_zero_percent_is_noop() {
        let img = solid(40, 20, [1, 2, 3, 255]);
        let out = add_padding(img, 0.0);
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn padding_uses_larger_dimension() {
        // max(100, 40) * 10% = 10 px on all sides
        let img = solid(100, 40, [1, 2, 3, 255]);
        let out = add_padding(img, 10.0);
        assert_eq!(out.dimensions(), (120, 60));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(10, 10), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn padding_rounding_to_zero_is_noop() {
        let img = solid(4, 4, [9, 9, 9, 255]);
        let out = add_padding(img, 1.0);
        assert_eq!(out.dimensions(), (4, 4));
    }

    // =========================================================================
    // Brightness / contrast
    // =========================================================================

    #[test]
    fn brightness_contrast_identity_at_unit_factors() {
        let img = with_border(8, 8, [200, 150, 100, 255], [40, 80, 120, 200]);
        let before = img.clone();
        assert_eq!(apply_brightness_contrast(img, 1.0, 1.0), before);
    }

    #[test]
    fn brightness_scales_channels() {
        let img = solid(4, 4, [100, 100, 100, 255]);
        let out = apply_brightness_contrast(img, 1.5, 1.0);
        assert_eq!(out.get_pixel(0, 0), &Rgba([150, 150, 150, 255]));
    }

    #[test]
    fn contrast_spreads_around_mid_gray() {
        let img = solid(4, 4, [178, 178, 178, 255]);
        // (178 - 128) * 2 + 128 = 228
        let out = apply_brightness_contrast(img, 1.0, 2.0);
        assert_eq!(out.get_pixel(0, 0), &Rgba([228, 228, 228, 255]));
        // Mid-gray is a fixed point
        let mid = solid(4, 4, [128, 128, 128, 255]);
        let out = apply_brightness_contrast(mid, 1.0, 3.0);
        assert_eq!(out.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn brightness_contrast_clamps_and_keeps_alpha() {
        let img = solid(4, 4, [240, 240, 240, 64]);
        let out = apply_brightness_contrast(img, 2.0, 1.0);
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 64]));
    }
}
