//! Canvas
//!
//! RGBA drawing surface and the primitives the compositor is built from.
//! None of the primitives resize the surface; they all paint into the
//! canvas at its current size and silently draw nothing for empty input.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::models::{CropData, Drawable, FitMode};

const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// Maximum blur radius in pixels at 100% intensity
pub const MAX_BLUR_RADIUS: f64 = 50.0;

/// Destination rectangle in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DestRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whole-pixel `(x, y, width, height)` after rounding
    pub fn rounded(&self) -> (i64, i64, u32, u32) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            self.width.round().max(0.0) as u32,
            self.height.round().max(0.0) as u32,
        )
    }
}

/// Off-screen RGBA surface, transparent when created
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Snapshot the current pixels as something drawable
    pub fn to_drawable(&self) -> Drawable {
        Drawable::Surface(Arc::new(self.pixels.clone()))
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Replace every pixel
    pub fn fill(&mut self, color: Rgba<u8>) {
        for p in self.pixels.pixels_mut() {
            *p = color;
        }
    }

    /// Overwrite a rectangle, clipped to the surface
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
        let x0 = x.clamp(0, self.width() as i64) as u32;
        let y0 = y.clamp(0, self.height() as i64) as u32;
        let x1 = (x + width as i64).clamp(0, self.width() as i64) as u32;
        let y1 = (y + height as i64).clamp(0, self.height() as i64) as u32;

        for yy in y0..y1 {
            for xx in x0..x1 {
                self.pixels.put_pixel(xx, yy, color);
            }
        }
    }

    /// Draw `src` scaled into `dest`, alpha-blended over existing pixels
    pub fn draw_image(&mut self, src: &RgbaImage, dest: DestRect) {
        let (x, y, w, h) = dest.rounded();
        if w == 0 || h == 0 || src.width() == 0 || src.height() == 0 {
            return;
        }

        if (w, h) == src.dimensions() {
            imageops::overlay(&mut self.pixels, src, x, y);
        } else {
            let scaled = imageops::resize(src, w, h, RESAMPLE_FILTER);
            imageops::overlay(&mut self.pixels, &scaled, x, y);
        }
    }

    /// Draw the `(sx, sy, sw, sh)` region of `src` scaled into `dest`
    pub fn draw_image_region(
        &mut self,
        src: &RgbaImage,
        region: (u32, u32, u32, u32),
        dest: DestRect,
    ) {
        let (sx, sy, sw, sh) = region;
        if sw == 0 || sh == 0 {
            return;
        }
        let part = imageops::crop_imm(src, sx, sy, sw, sh).to_image();
        self.draw_image(&part, dest);
    }
}

/// Rectangle that centers a `src_w` x `src_h` image in the target with the
/// given fit. `Contain` never crops, `Cover` always fills.
pub fn centered_rect(src_w: u32, src_h: u32, width: u32, height: u32, fit: FitMode) -> DestRect {
    if src_w == 0 || src_h == 0 {
        return DestRect::new(width as f64 / 2.0, height as f64 / 2.0, 0.0, 0.0);
    }

    let sx = width as f64 / src_w as f64;
    let sy = height as f64 / src_h as f64;
    let scale = match fit {
        FitMode::Contain => sx.min(sy),
        FitMode::Cover => sx.max(sy),
    };

    let w = src_w as f64 * scale;
    let h = src_h as f64 * scale;
    DestRect::new((width as f64 - w) / 2.0, (height as f64 - h) / 2.0, w, h)
}

/// Draw the image centered with contain or cover and return where it landed
pub fn draw_centered_image(canvas: &mut Canvas, image: &Drawable, fit: FitMode) -> DestRect {
    let rect = centered_rect(image.width(), image.height(), canvas.width(), canvas.height(), fit);
    canvas.draw_image(&image.rgba(), rect);
    rect
}

/// Blur radius for a 0-100 intensity
pub fn blur_radius(intensity: u8) -> u32 {
    (intensity.min(100) as f64 / 100.0 * MAX_BLUR_RADIUS).round() as u32
}

/// Cover-fill with a blurred copy of the image.
///
/// The image is drawn with a bleed of twice the radius on every side so the
/// blur never pulls transparent pixels in at the edges.
pub fn draw_blurred_background(canvas: &mut Canvas, image: &Drawable, intensity: u8) {
    let radius = blur_radius(intensity);
    if radius == 0 {
        draw_centered_image(canvas, image, FitMode::Cover);
        return;
    }
    if canvas.is_empty() {
        return;
    }

    let bleed = radius * 2;
    let mut oversized = Canvas::new(canvas.width() + bleed * 2, canvas.height() + bleed * 2);
    draw_centered_image(&mut oversized, image, FitMode::Cover);

    let blurred = imageops::fast_blur(oversized.as_image(), radius as f32);
    let visible =
        imageops::crop_imm(&blurred, bleed, bleed, canvas.width(), canvas.height()).to_image();
    imageops::overlay(&mut canvas.pixels, &visible, 0, 0);
}

pub fn draw_solid_background(canvas: &mut Canvas, color: Rgba<u8>) {
    canvas.fill(color);
}

/// Two-stop linear gradient, left to right
pub fn draw_gradient_background(canvas: &mut Canvas, start: Rgba<u8>, end: Rgba<u8>) {
    let width = canvas.width();
    if width == 0 {
        return;
    }

    let column: Vec<Rgba<u8>> = (0..width)
        .map(|x| {
            let t = (x as f64 + 0.5) / width as f64;
            let mut out = [0u8; 4];
            for (i, c) in out.iter_mut().enumerate() {
                let a = start.0[i] as f64;
                let b = end.0[i] as f64;
                *c = (a + (b - a) * t).round() as u8;
            }
            Rgba(out)
        })
        .collect();

    for (x, _, p) in canvas.pixels.enumerate_pixels_mut() {
        *p = column[x as usize];
    }
}

/// Stretch the crop rectangle over the whole canvas.
///
/// The crop's own aspect ratio decides the look; nothing is preserved.
pub fn apply_crop(canvas: &mut Canvas, image: &Drawable, crop: &CropData) {
    let Some(region) = crop.clamped(image.width(), image.height()) else {
        return;
    };
    let dest = DestRect::new(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
    canvas.draw_image_region(&image.rgba(), region, dest);
}

/// Horizontal layout of a height-filled image: `(left band, image, right band)`.
/// `None` when the image already covers the full width.
fn side_bands(canvas: &Canvas, src_w: u32, src_h: u32) -> Option<(u32, u32, u32)> {
    if src_w == 0 || src_h == 0 {
        return None;
    }
    let scale = canvas.height() as f64 / src_h as f64;
    let image_w = (src_w as f64 * scale).round() as u32;
    if image_w >= canvas.width() {
        return None;
    }

    let left = (canvas.width() - image_w) / 2;
    let right = canvas.width() - image_w - left;
    Some((left, image_w, right))
}

fn draw_height_filled(canvas: &mut Canvas, src: &RgbaImage, left: u32, image_w: u32) {
    let dest = DestRect::new(left as f64, 0.0, image_w as f64, canvas.height() as f64);
    canvas.draw_image(src, dest);
}

/// Fill the side bands with mirrored halves of the image, then draw the
/// image itself in the middle.
pub fn draw_mirrored_edges(canvas: &mut Canvas, image: &Drawable) {
    let pixels = image.rgba();
    let src: &RgbaImage = &pixels;
    let Some((left, image_w, right)) = side_bands(canvas, src.width(), src.height()) else {
        draw_centered_image(canvas, image, FitMode::Cover);
        return;
    };
    let height = canvas.height() as f64;

    let half = (src.width() / 2).max(1);
    if left > 0 {
        let left_half = imageops::crop_imm(src, 0, 0, half, src.height()).to_image();
        let mirrored = imageops::flip_horizontal(&left_half);
        canvas.draw_image(&mirrored, DestRect::new(0.0, 0.0, left as f64, height));
    }
    if right > 0 {
        let start = src.width() - half;
        let right_half = imageops::crop_imm(src, start, 0, half, src.height()).to_image();
        let mirrored = imageops::flip_horizontal(&right_half);
        let x = (left + image_w) as f64;
        canvas.draw_image(&mirrored, DestRect::new(x, 0.0, right as f64, height));
    }

    draw_height_filled(canvas, src, left, image_w);
}

/// Fill the side bands by smearing the outermost pixel columns, then draw
/// the image itself in the middle.
pub fn draw_stretched_edges(canvas: &mut Canvas, image: &Drawable) {
    let pixels = image.rgba();
    let src: &RgbaImage = &pixels;
    let Some((left, image_w, right)) = side_bands(canvas, src.width(), src.height()) else {
        draw_centered_image(canvas, image, FitMode::Cover);
        return;
    };
    let height = canvas.height() as f64;

    if left > 0 {
        canvas.draw_image_region(
            src,
            (0, 0, 1, src.height()),
            DestRect::new(0.0, 0.0, left as f64, height),
        );
    }
    if right > 0 {
        let x = (left + image_w) as f64;
        canvas.draw_image_region(
            src,
            (src.width() - 1, 0, 1, src.height()),
            DestRect::new(x, 0.0, right as f64, height),
        );
    }

    draw_height_filled(canvas, src, left, image_w);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// Image whose column `x` has red channel `x * 20` and full alpha
    pub(crate) fn column_ramp(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| Rgba([(x * 20) as u8, 40, 80, 255]))
    }

    #[test]
    fn test_contain_preserves_aspect_and_stays_inside() {
        let cases = [(800, 600, 1920, 1080), (100, 400, 300, 300), (1, 1, 7, 3), (4000, 10, 50, 50)];
        for (sw, sh, w, h) in cases {
            let r = centered_rect(sw, sh, w, h, FitMode::Contain);
            assert!(r.x >= -1e-9 && r.y >= -1e-9);
            assert!(r.x + r.width <= w as f64 + 1e-9);
            assert!(r.y + r.height <= h as f64 + 1e-9);
            let src_ratio = sw as f64 / sh as f64;
            assert!((r.width / r.height - src_ratio).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cover_always_fills() {
        let r = centered_rect(800, 600, 1920, 1080, FitMode::Cover);
        assert!(r.width >= 1920.0 && r.height >= 1080.0);
        assert!(r.x <= 0.0 && r.y <= 0.0);
    }

    #[test]
    fn test_draw_centered_contain_letterboxes() {
        let mut canvas = Canvas::new(40, 20);
        let image = Drawable::from(RgbaImage::from_pixel(10, 10, RED));
        let rect = draw_centered_image(&mut canvas, &image, FitMode::Contain);
        assert_eq!(rect.rounded(), (10, 0, 20, 20));
        assert_eq!(canvas.pixel(0, 10).0[3], 0);
        assert_eq!(canvas.pixel(20, 10), RED);
        assert_eq!(canvas.pixel(39, 10).0[3], 0);
    }

    #[test]
    fn test_solid_and_gradient() {
        let mut canvas = Canvas::new(10, 2);
        draw_solid_background(&mut canvas, BLUE);
        assert!(canvas.as_image().pixels().all(|p| *p == BLUE));

        draw_gradient_background(&mut canvas, Rgba([0, 0, 0, 255]), Rgba([200, 0, 0, 255]));
        assert_eq!(canvas.pixel(0, 0), Rgba([10, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 1), Rgba([190, 0, 0, 255]));
        assert!(canvas.pixel(3, 0).0[0] < canvas.pixel(4, 0).0[0]);
    }

    #[test]
    fn test_blur_zero_is_cover() {
        let image = Drawable::from(column_ramp(8, 4));
        let mut blurred = Canvas::new(16, 8);
        draw_blurred_background(&mut blurred, &image, 0);
        let mut cover = Canvas::new(16, 8);
        draw_centered_image(&mut cover, &image, FitMode::Cover);
        assert_eq!(blurred, cover);
    }

    #[test]
    fn test_blur_has_no_transparent_edges() {
        let image = Drawable::from(RgbaImage::from_pixel(20, 10, RED));
        let mut canvas = Canvas::new(30, 30);
        draw_blurred_background(&mut canvas, &image, 20);
        assert_eq!(blur_radius(20), 10);
        for (x, y) in [(0, 0), (29, 0), (0, 29), (29, 29), (15, 15)] {
            assert!(canvas.pixel(x, y).0[3] > 250, "({x},{y})");
            assert!(canvas.pixel(x, y).0[0] > 200);
        }
    }

    #[test]
    fn test_apply_crop_stretches_region() {
        let mut src = RgbaImage::from_pixel(10, 10, BLUE);
        for y in 0..5 {
            for x in 0..5 {
                src.put_pixel(x, y, RED);
            }
        }
        let mut canvas = Canvas::new(30, 12);
        apply_crop(&mut canvas, &Drawable::from(src), &CropData::new(0.0, 0.0, 5.0, 5.0));
        assert!(canvas.as_image().pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_apply_crop_empty_draws_nothing() {
        let mut canvas = Canvas::new(8, 8);
        let image = Drawable::from(RgbaImage::from_pixel(4, 4, RED));
        apply_crop(&mut canvas, &image, &CropData::new(2.0, 2.0, 0.0, 0.0));
        assert!(canvas.as_image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_mirrored_edges_mirror_nearest_half() {
        let src = column_ramp(8, 4);
        let mut canvas = Canvas::new(16, 4);
        draw_mirrored_edges(&mut canvas, &Drawable::from(src.clone()));

        for y in 0..4 {
            // Left band mirrors columns 0..4, right band mirrors 4..8
            for i in 0..4 {
                assert_eq!(canvas.pixel(3 - i, y), *src.get_pixel(i, y));
                assert_eq!(canvas.pixel(12 + i, y), *src.get_pixel(7 - i, y));
            }
            for x in 0..8 {
                assert_eq!(canvas.pixel(4 + x, y), *src.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_stretched_edges_smear_outer_columns() {
        let src = column_ramp(8, 4);
        let mut canvas = Canvas::new(20, 4);
        draw_stretched_edges(&mut canvas, &Drawable::from(src.clone()));

        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(canvas.pixel(x, y), *src.get_pixel(0, y));
                assert_eq!(canvas.pixel(14 + x, y), *src.get_pixel(7, y));
            }
        }
        assert_eq!(canvas.pixel(6, 0), *src.get_pixel(0, 0));
        assert_eq!(canvas.pixel(13, 0), *src.get_pixel(7, 0));
    }

    #[test]
    fn test_extend_wider_source_falls_back_to_cover() {
        let image = Drawable::from(RgbaImage::from_pixel(100, 10, RED));
        let mut canvas = Canvas::new(20, 10);
        draw_mirrored_edges(&mut canvas, &image);
        assert!(canvas.as_image().pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_empty_canvas_is_harmless() {
        let image = Drawable::from(RgbaImage::from_pixel(4, 4, RED));
        let mut canvas = Canvas::new(0, 0);
        draw_centered_image(&mut canvas, &image, FitMode::Contain);
        draw_blurred_background(&mut canvas, &image, 80);
        draw_mirrored_edges(&mut canvas, &image);
        draw_stretched_edges(&mut canvas, &image);
        draw_gradient_background(&mut canvas, RED, BLUE);
        assert!(canvas.is_empty());
    }
}
