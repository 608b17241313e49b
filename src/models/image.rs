//! Image Models
//!
//! Source images, drawable surfaces and crop rectangles.

use std::borrow::Cow;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A decoded image supplied by the uploader
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// Stable identity of the source (SHA-256 of the original bytes)
    pub source_key: String,
    /// Display name, usually the original filename
    pub name: String,
    /// Size of the original bytes
    pub size: u64,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Decoded bitmap
    pub bitmap: Arc<DynamicImage>,
}

impl ImageFile {
    pub fn new(
        source_key: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        bitmap: DynamicImage,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            name: name.into(),
            size,
            width: bitmap.width(),
            height: bitmap.height(),
            bitmap: Arc::new(bitmap),
        }
    }

    /// The bitmap as a drawable
    pub fn drawable(&self) -> Drawable {
        Drawable::Bitmap(Arc::clone(&self.bitmap))
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.width, self.height)
    }
}

/// Anything the canvas primitives can draw from.
///
/// Decoded bitmaps keep their native pixel layout; rendered surfaces are
/// always RGBA8.
#[derive(Debug, Clone)]
pub enum Drawable {
    Bitmap(Arc<DynamicImage>),
    Surface(Arc<RgbaImage>),
}

impl Drawable {
    pub fn width(&self) -> u32 {
        match self {
            Self::Bitmap(img) => img.width(),
            Self::Surface(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Bitmap(img) => img.height(),
            Self::Surface(img) => img.height(),
        }
    }

    /// Borrow the pixels as RGBA8, converting only when the bitmap uses
    /// another layout.
    pub fn rgba(&self) -> Cow<'_, RgbaImage> {
        match self {
            Self::Bitmap(img) => match img.as_ref() {
                DynamicImage::ImageRgba8(buf) => Cow::Borrowed(buf),
                other => Cow::Owned(other.to_rgba8()),
            },
            Self::Surface(img) => Cow::Borrowed(img.as_ref()),
        }
    }

    /// Whether both drawables share the same pixel storage
    pub fn same_as(&self, other: &Drawable) -> bool {
        match (self, other) {
            (Self::Bitmap(a), Self::Bitmap(b)) => Arc::ptr_eq(a, b),
            (Self::Surface(a), Self::Surface(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<RgbaImage> for Drawable {
    fn from(img: RgbaImage) -> Self {
        Self::Surface(Arc::new(img))
    }
}

impl From<DynamicImage> for Drawable {
    fn from(img: DynamicImage) -> Self {
        Self::Bitmap(Arc::new(img))
    }
}

/// Image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// Crop rectangle in source-image pixel coordinates.
///
/// Bounds are not enforced here; callers clamp against the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropData {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropData {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Round to whole pixels and clamp into a `width` x `height` source.
    /// Returns `None` when nothing is left.
    pub fn clamped(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.round().clamp(0.0, width as f64);
        let y0 = self.y.round().clamp(0.0, height as f64);
        let x1 = (self.x + self.width).round().clamp(0.0, width as f64);
        let y1 = (self.y + self.height).round().clamp(0.0, height as f64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// A remotely generated image attached to wallpaper settings
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Handle for this generation
    pub id: Uuid,
    /// Decoded pixels
    pub image: Arc<RgbaImage>,
    /// Raw bytes as returned by the provider
    pub size: usize,
    /// Strength used for the request
    pub strength: f32,
}

impl GeneratedImage {
    pub fn new(image: RgbaImage, size: usize, strength: f32) -> Self {
        Self {
            id: Uuid::now_v7(),
            image: Arc::new(image),
            size,
            strength,
        }
    }

    pub fn drawable(&self) -> Drawable {
        Drawable::Surface(Arc::clone(&self.image))
    }
}

impl PartialEq for GeneratedImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
