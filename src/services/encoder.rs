//! Encoder
//!
//! Canvas to bytes for every export format, the PNG-in-ICO container and
//! the quality search that aims at a target file size.

use std::io::{Cursor, Write};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat as ImgFormat, RgbaImage};

use super::canvas::Canvas;
use crate::models::ExportFormat;

/// Lowest quality the size search will try
pub const MIN_QUALITY: u8 = 10;
/// Default starting point of the size search
pub const DEFAULT_START_QUALITY: u8 = 95;
/// Search stops once the quality bracket is this narrow
const QUALITY_BRACKET: u8 = 5;

const ICO_HEADER_LEN: usize = 6;
const ICO_ENTRY_LEN: usize = 16;
/// Offset of the embedded PNG: header plus one directory entry
pub const ICO_DATA_OFFSET: u32 = (ICO_HEADER_LEN + ICO_ENTRY_LEN) as u32;

/// Largest side libwebp accepts
pub const WEBP_MAX_DIMENSION: u32 = 16383;

#[cfg(feature = "avif")]
const AVIF_SPEED: u8 = 8;

/// Encoding error
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to create blob: canvas is {0}x{1}")]
    EmptyCanvas(u32, u32),
    #[error("{format} cannot encode a {width}x{height} canvas")]
    TooLarge {
        format: &'static str,
        width: u32,
        height: u32,
    },
    #[error("WebP encoding failed: {0}")]
    Webp(String),
}

/// Encode a canvas. Quality (1-100) is only passed on to formats that
/// support it.
pub fn canvas_to_blob(
    canvas: &Canvas,
    format: ExportFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    encode_image(canvas.as_image(), format, quality)
}

pub fn encode_image(
    image: &RgbaImage,
    format: ExportFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EncodeError::EmptyCanvas(image.width(), image.height()));
    }

    let quality = quality.clamp(1, 100);
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    match format {
        ExportFormat::Png => {
            image.write_to(&mut cursor, ImgFormat::Png)?;
        }
        ExportFormat::Bmp => {
            image.write_to(&mut cursor, ImgFormat::Bmp)?;
        }
        ExportFormat::Jpg => {
            // JPEG has no alpha; transparent pixels end up black
            let flattened = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            flattened.write_with_encoder(encoder)?;
        }
        ExportFormat::Webp => {
            if image.width() > WEBP_MAX_DIMENSION || image.height() > WEBP_MAX_DIMENSION {
                return Err(EncodeError::TooLarge {
                    format: "webp",
                    width: image.width(),
                    height: image.height(),
                });
            }
            let encoded = webp::Encoder::from_rgba(image.as_raw(), image.width(), image.height())
                .encode_simple(false, quality as f32)
                .map_err(|e| EncodeError::Webp(format!("{:?}", e)))?;
            cursor.write_all(&encoded)?;
        }
        ExportFormat::Avif => {
            encode_avif(image, &mut cursor, quality)?;
        }
        ExportFormat::Ico => {
            let png = encode_image(image, ExportFormat::Png, 100)?;
            return Ok(png_to_ico(&png));
        }
    }

    Ok(buffer)
}

#[cfg(feature = "avif")]
fn encode_avif(
    image: &RgbaImage,
    cursor: &mut Cursor<&mut Vec<u8>>,
    quality: u8,
) -> Result<(), EncodeError> {
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(cursor, AVIF_SPEED, quality);
    image.write_with_encoder(encoder)?;
    Ok(())
}

#[cfg(not(feature = "avif"))]
fn encode_avif(
    _image: &RgbaImage,
    _cursor: &mut Cursor<&mut Vec<u8>>,
    _quality: u8,
) -> Result<(), EncodeError> {
    Err(EncodeError::UnsupportedFormat(
        "avif (built without the `avif` feature)".to_string(),
    ))
}

/// Wrap PNG bytes in a single-image ICO container.
///
/// Width and height are written as 0 ("256 or more"), 1 plane, 32 bpp; the
/// PNG follows the directory verbatim.
pub fn png_to_ico(png: &[u8]) -> Vec<u8> {
    let size = png.len() as u32;
    let mut ico = Vec::with_capacity(ICO_HEADER_LEN + ICO_ENTRY_LEN + png.len());

    // Header: reserved, type 1 (icon), one image
    ico.extend_from_slice(&[0, 0, 1, 0, 1, 0]);

    // Directory entry
    ico.push(0); // width
    ico.push(0); // height
    ico.push(0); // palette
    ico.push(0); // reserved
    ico.extend_from_slice(&1u16.to_le_bytes()); // color planes
    ico.extend_from_slice(&32u16.to_le_bytes()); // bits per pixel
    ico.extend_from_slice(&size.to_le_bytes());
    ico.extend_from_slice(&ICO_DATA_OFFSET.to_le_bytes());

    ico.extend_from_slice(png);
    ico
}

/// Result of a size-targeted encode
#[derive(Debug, Clone)]
pub struct OptimizedBlob {
    pub bytes: Vec<u8>,
    pub quality: u8,
}

impl OptimizedBlob {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Binary-search the quality in `[10, start_quality]` for an encode no
/// larger than `target_size_mb`.
///
/// Never fails on size: when nothing fits, the quality 10 encode is
/// returned as the best effort. ICO has no quality and returns at once.
pub fn optimize_to_target_size(
    canvas: &Canvas,
    target_size_mb: f64,
    format: ExportFormat,
    start_quality: u8,
) -> Result<OptimizedBlob, EncodeError> {
    let target_bytes = (target_size_mb.max(0.0) * 1024.0 * 1024.0) as usize;
    let mut quality = start_quality.clamp(MIN_QUALITY, 100);
    let mut bytes = canvas_to_blob(canvas, format, quality)?;

    if format == ExportFormat::Ico {
        return Ok(OptimizedBlob { bytes, quality: 100 });
    }

    let mut min_quality = MIN_QUALITY;
    let mut max_quality = quality;

    while max_quality - min_quality > QUALITY_BRACKET && bytes.len() > target_bytes {
        quality = (min_quality + max_quality) / 2;
        bytes = canvas_to_blob(canvas, format, quality)?;

        if bytes.len() > target_bytes {
            max_quality = quality;
        } else {
            min_quality = quality;
        }
    }

    if bytes.len() > target_bytes && quality > MIN_QUALITY {
        bytes = canvas_to_blob(canvas, format, MIN_QUALITY)?;
        quality = MIN_QUALITY;
    }

    tracing::debug!(
        "Size search for {} settled on quality {} ({} bytes, target {})",
        format.id(),
        quality,
        bytes.len(),
        target_bytes
    );

    Ok(OptimizedBlob { bytes, quality })
}
