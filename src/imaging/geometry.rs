//! Size and canvas transforms.
//!
//! All scaling goes through Lanczos3 resampling. Canvas extensions center
//! the image on a fully transparent background; flattening for opaque
//! output formats happens at save time.

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::debug;

/// Aspect ratios closer than this are treated as already matching.
const ASPECT_EPSILON: f32 = 0.001;

/// Downscale so both dimensions fit within the given box, keeping aspect
/// ratio. Images already inside the box are returned unchanged; this never
/// upscales.
pub fn fit_within(img: RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return img;
    }
    let ratio = (max_width as f32 / width as f32).min(max_height as f32 / height as f32);
    let new_w = ((width as f32 * ratio).round() as u32).max(1);
    let new_h = ((height as f32 * ratio).round() as u32).max(1);
    debug!(from = ?(width, height), to = ?(new_w, new_h), "downscaled to fit");
    image::imageops::resize(&img, new_w, new_h, FilterType::Lanczos3)
}

/// Scale (up or down) so both dimensions fit within the given box, keeping
/// aspect ratio.
pub fn scale_to_fit(img: &RgbaImage, box_width: u32, box_height: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let ratio = (box_width as f32 / width as f32).min(box_height as f32 / height as f32);
    let new_w = ((width as f32 * ratio).round() as u32).max(1);
    let new_h = ((height as f32 * ratio).round() as u32).max(1);
    if (new_w, new_h) == (width, height) {
        return img.clone();
    }
    image::imageops::resize(img, new_w, new_h, FilterType::Lanczos3)
}

/// Extend the canvas along one axis until the image matches the target
/// aspect ratio. Never scales or crops the content; the extension is
/// transparent and the original is centered on it.
pub fn force_aspect_ratio(img: RgbaImage, ratio_w: u32, ratio_h: u32) -> RgbaImage {
    if ratio_w == 0 || ratio_h == 0 {
        return img;
    }
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img;
    }
    let target = ratio_w as f32 / ratio_h as f32;
    let current = width as f32 / height as f32;
    if (current - target).abs() <= ASPECT_EPSILON {
        return img;
    }

    // Too wide: grow the height. Too tall: grow the width.
    let (canvas_w, canvas_h) = if current > target {
        (width, ((width as f32 / target).round() as u32).max(height))
    } else {
        (((height as f32 * target).round() as u32).max(width), height)
    };
    debug!(
        from = ?(width, height),
        to = ?(canvas_w, canvas_h),
        "extended canvas to target aspect ratio"
    );
    center_on_canvas(&img, canvas_w, canvas_h)
}

/// Scale the image to fit exactly within `target_w` x `target_h` (upscaling
/// if needed) and center it on a transparent canvas of exactly that size.
pub fn exact_canvas(img: RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    let scaled = scale_to_fit(&img, target_w, target_h);
    if scaled.dimensions() == (target_w, target_h) {
        return scaled;
    }
    debug!(size = ?(target_w, target_h), "placed on exact canvas");
    center_on_canvas(&scaled, target_w, target_h)
}

/// Transparent canvas of the given size with the image centered on it.
fn center_on_canvas(img: &RgbaImage, canvas_w: u32, canvas_h: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([0, 0, 0, 0]));
    let x = (canvas_w.saturating_sub(width) / 2) as i64;
    let y = (canvas_h.saturating_sub(height) / 2) as i64;
    image::imageops::overlay(&mut canvas, img, x, y);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid;

    #[test]
    fn fit_within_never_upscales() {
        let img = solid(100, 50, [1, 2, 3, 255]);
        let out = fit_within(img, 500, 500);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn fit_within_downscales_keeping_aspect() {
        let img = solid(2000, 1000, [1, 2, 3, 255]);
        let out = fit_within(img, 500, 500);
        assert_eq!(out.dimensions(), (500, 250));
    }

    #[test]
    fn fit_within_binds_on_the_tighter_axis() {
        let img = solid(1000, 2000, [1, 2, 3, 255]);
        let out = fit_within(img, 800, 500);
        assert_eq!(out.dimensions(), (250, 500));
    }

    #[test]
    fn fit_within_floors_at_one_pixel() {
        let img = solid(10000, 2, [1, 2, 3, 255]);
        let out = fit_within(img, 100, 100);
        assert_eq!(out.dimensions(), (100, 1));
    }

    #[test]
    fn scale_to_fit_upscales() {
        let img = solid(50, 25, [1, 2, 3, 255]);
        let out = scale_to_fit(&img, 200, 200);
        assert_eq!(out.dimensions(), (200, 100));
    }

    #[test]
    fn aspect_matching_within_epsilon_is_noop() {
        let img = solid(1000, 1001, [7, 7, 7, 255]);
        let out = force_aspect_ratio(img, 1, 1);
        assert_eq!(out.dimensions(), (1000, 1001));
    }

    #[test]
    fn aspect_wider_than_target_grows_height() {
        let img = solid(200, 100, [7, 7, 7, 255]);
        let out = force_aspect_ratio(img, 1, 1);
        assert_eq!(out.dimensions(), (200, 200));
        // Original band is centered, extension is transparent
        assert_eq!(out.get_pixel(100, 0)[3], 0);
        assert_eq!(out.get_pixel(100, 100)[3], 255);
    }

    #[test]
    fn aspect_taller_than_target_grows_width() {
        let img = solid(100, 300, [7, 7, 7, 255]);
        let out = force_aspect_ratio(img, 16, 9);
        // 300 * 16/9 = 533.33 → 533
        assert_eq!(out.dimensions(), (533, 300));
    }

    #[test]
    fn aspect_zero_ratio_component_is_noop() {
        let img = solid(30, 10, [7, 7, 7, 255]);
        let out = force_aspect_ratio(img, 0, 9);
        assert_eq!(out.dimensions(), (30, 10));
    }

    #[test]
    fn exact_canvas_centers_and_pads() {
        let img = solid(100, 50, [9, 9, 9, 255]);
        let out = exact_canvas(img, 200, 200);
        assert_eq!(out.dimensions(), (200, 200));
        // 100x50 scales to 200x100, centered vertically
        assert_eq!(out.get_pixel(100, 10)[3], 0);
        assert_eq!(out.get_pixel(100, 100)[3], 255);
        assert_eq!(out.get_pixel(100, 190)[3], 0);
    }

    #[test]
    fn exact_canvas_upscales_small_input() {
        let img = solid(10, 10, [9, 9, 9, 255]);
        let out = exact_canvas(img, 64, 64);
        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(out.get_pixel(32, 32)[3], 255);
    }
}
