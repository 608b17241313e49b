//! Transform
//!
//! Decode boundary and the basic rotate/flip/crop/resize tool.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use sha2::{Digest, Sha256};

use super::canvas::Canvas;
use crate::models::{ImageFile, Rotation, ToolSettings};

/// Longest side of a tool preview
pub const DEFAULT_PREVIEW_MAX_DIMENSION: u32 = 800;

/// Decode uploaded bytes. The SHA-256 of the bytes becomes the source
/// identity used by the bitmap cache.
pub fn load_image(data: &[u8], name: &str) -> Result<ImageFile, image::ImageError> {
    let bitmap = image::load_from_memory(data)?;

    let mut hasher = Sha256::new();
    hasher.update(data);
    let source_key = hex::encode(hasher.finalize());

    tracing::debug!(
        "Loaded {} ({}x{}, {} bytes)",
        name,
        bitmap.width(),
        bitmap.height(),
        data.len()
    );

    Ok(ImageFile::new(source_key, name, data.len() as u64, bitmap))
}

/// Source region after applying the crop, in source pixels
fn source_region(image: &ImageFile, settings: &ToolSettings) -> Option<(u32, u32, u32, u32)> {
    match &settings.crop {
        Some(crop) => crop.clamped(image.width, image.height),
        None if image.width > 0 && image.height > 0 => Some((0, 0, image.width, image.height)),
        None => None,
    }
}

fn post_rotation_size(width: u32, height: u32, rotation: Rotation) -> (u32, u32) {
    if rotation.is_quarter_turn() {
        (height, width)
    } else {
        (width, height)
    }
}

/// Crop, flip, rotate, then resize to `resize.width` x `resize.height`
/// (0 keeps the post-rotation size).
///
/// An empty crop yields an empty canvas.
pub fn apply_transformations(image: &ImageFile, settings: &ToolSettings) -> Canvas {
    let Some((x, y, w, h)) = source_region(image, settings) else {
        return Canvas::new(0, 0);
    };

    let drawable = image.drawable();
    let pixels = drawable.rgba();
    let src: &RgbaImage = &pixels;
    let mut out = imageops::crop_imm(src, x, y, w, h).to_image();

    if settings.flip_h {
        imageops::flip_horizontal_in_place(&mut out);
    }
    if settings.flip_v {
        imageops::flip_vertical_in_place(&mut out);
    }

    out = match settings.rotation {
        Rotation::None => out,
        Rotation::Cw90 => imageops::rotate90(&out),
        Rotation::Half => imageops::rotate180(&out),
        Rotation::Cw270 => imageops::rotate270(&out),
    };

    let (rot_w, rot_h) = post_rotation_size(w, h, settings.rotation);
    let out_w = if settings.resize.width > 0 { settings.resize.width } else { rot_w };
    let out_h = if settings.resize.height > 0 { settings.resize.height } else { rot_h };

    if (out_w, out_h) != out.dimensions() {
        out = imageops::resize(&out, out_w, out_h, FilterType::Lanczos3);
    }

    Canvas::from_image(out)
}

/// Same pipeline, scaled down so the longest side fits `max_dimension`
pub fn create_preview_canvas(
    image: &ImageFile,
    settings: &ToolSettings,
    max_dimension: u32,
) -> Canvas {
    let Some((_, _, w, h)) = source_region(image, settings) else {
        return Canvas::new(0, 0);
    };
    let (rot_w, rot_h) = post_rotation_size(w, h, settings.rotation);

    let longest = rot_w.max(rot_h).max(1) as f64;
    let scale = (max_dimension as f64 / longest).min(1.0);

    let mut preview = settings.clone();
    preview.resize.width = ((rot_w as f64 * scale).round() as u32).max(1);
    preview.resize.height = ((rot_h as f64 * scale).round() as u32).max(1);

    apply_transformations(image, &preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba};

    use crate::models::{CropData, ExportFormat};
    use crate::services::encoder::encode_image;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 4x2 image, left column red, everything else blue
    fn marked() -> ImageFile {
        let img = RgbaImage::from_fn(4, 2, |x, _| if x == 0 { RED } else { BLUE });
        ImageFile::new("m", "marked.png", 0, DynamicImage::ImageRgba8(img))
    }

    fn keep_size(image: &ImageFile) -> ToolSettings {
        let mut settings = ToolSettings::for_image(Some(image));
        settings.resize.width = 0;
        settings.resize.height = 0;
        settings
    }

    #[test]
    fn test_load_image_hashes_bytes() {
        let png = encode_image(&RgbaImage::from_pixel(3, 2, RED), ExportFormat::Png, 100).unwrap();
        let a = load_image(&png, "a.png").unwrap();
        let b = load_image(&png, "b.png").unwrap();
        assert_eq!((a.width, a.height), (3, 2));
        assert_eq!(a.size, png.len() as u64);
        assert_eq!(a.source_key, b.source_key);
        assert_eq!(a.source_key.len(), 64);
        assert!(load_image(b"nope", "x.png").is_err());
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let image = marked();
        let mut settings = keep_size(&image);
        settings.rotation = Rotation::Cw90;
        let canvas = apply_transformations(&image, &settings);
        assert_eq!((canvas.width(), canvas.height()), (2, 4));
        // Left column ends up on top after a clockwise quarter turn
        assert_eq!(canvas.pixel(0, 0), RED);
        assert_eq!(canvas.pixel(1, 0), RED);
        assert_eq!(canvas.pixel(0, 3), BLUE);
    }

    #[test]
    fn test_flip_horizontal() {
        let image = marked();
        let mut settings = keep_size(&image);
        settings.flip_h = true;
        let canvas = apply_transformations(&image, &settings);
        assert_eq!(canvas.pixel(3, 0), RED);
        assert_eq!(canvas.pixel(0, 0), BLUE);
    }

    #[test]
    fn test_crop_then_resize() {
        let image = marked();
        let mut settings = keep_size(&image);
        settings.crop = Some(CropData::new(1.0, 0.0, 3.0, 2.0));
        let cropped = apply_transformations(&image, &settings);
        assert_eq!((cropped.width(), cropped.height()), (3, 2));
        assert!(cropped.as_image().pixels().all(|p| *p == BLUE));

        settings.resize.width = 6;
        settings.resize.height = 4;
        let resized = apply_transformations(&image, &settings);
        assert_eq!((resized.width(), resized.height()), (6, 4));
    }

    #[test]
    fn test_empty_crop_is_empty_canvas() {
        let image = marked();
        let mut settings = keep_size(&image);
        settings.crop = Some(CropData::new(10.0, 10.0, 5.0, 5.0));
        assert!(apply_transformations(&image, &settings).is_empty());
    }

    #[test]
    fn test_preview_is_capped() {
        let img = RgbaImage::from_pixel(2000, 1000, BLUE);
        let image = ImageFile::new("big", "big.png", 0, DynamicImage::ImageRgba8(img));
        let settings = ToolSettings::for_image(Some(&image));

        let preview = create_preview_canvas(&image, &settings, DEFAULT_PREVIEW_MAX_DIMENSION);
        assert_eq!((preview.width(), preview.height()), (800, 400));

        let small = marked();
        let preview = create_preview_canvas(&small, &keep_size(&small), 800);
        assert_eq!((preview.width(), preview.height()), (4, 2));
    }
}
