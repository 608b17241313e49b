//! Geometry
//!
//! Target canvas size derivation from wallpaper and output settings.

use crate::models::{
    get_aspect_ratio, get_preset_by_id, ImageDimensions, Orientation, OutputSettings,
    WallpaperSettings,
};

const DEFAULT_CUSTOM_WIDTH: u32 = 1920;
const DEFAULT_CUSTOM_HEIGHT: u32 = 1080;
const FALLBACK_RATIO: f64 = 16.0 / 9.0;

/// Resolve the output canvas size.
///
/// Input is not sanitized: zero custom sizes produce an empty canvas.
pub fn calculate_target_dimensions(
    wallpaper: &WallpaperSettings,
    output: &OutputSettings,
) -> ImageDimensions {
    let preset = get_preset_by_id(&output.preset);

    if !wallpaper.enabled {
        return match preset {
            Some(p) => ImageDimensions::new(p.width, p.height),
            None => ImageDimensions::new(output.custom_width, output.custom_height),
        };
    }

    let aspect = get_aspect_ratio(&wallpaper.aspect_ratio);

    if aspect.is_some_and(|a| a.ratio.is_none()) {
        let dims = ImageDimensions::new(
            wallpaper.custom_width.unwrap_or(DEFAULT_CUSTOM_WIDTH),
            wallpaper.custom_height.unwrap_or(DEFAULT_CUSTOM_HEIGHT),
        );
        return if wallpaper.orientation == Orientation::Vertical && dims.width > dims.height {
            dims.swapped()
        } else {
            dims
        };
    }

    let base_width = preset.map(|p| p.width).unwrap_or(output.custom_width);

    let Some(ratio) = aspect.and_then(|a| a.ratio) else {
        return ImageDimensions::new(base_width, scaled(base_width, FALLBACK_RATIO));
    };

    match wallpaper.orientation {
        Orientation::Horizontal => ImageDimensions::new(base_width, scaled(base_width, ratio)),
        // A preset keeps its own footprint and is simply turned on its side.
        // Only the free-form path goes through the inverted ratio.
        Orientation::Vertical => match preset {
            Some(p) => ImageDimensions::new(p.height, p.width),
            None => ImageDimensions::new(base_width, scaled(base_width, 1.0 / ratio)),
        },
    }
}

fn scaled(width: u32, ratio: f64) -> u32 {
    (width as f64 / ratio).round() as u32
}
