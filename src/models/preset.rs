//! Preset Models
//!
//! Static catalogs: resolution presets, aspect ratios and export formats.

use serde::{Deserialize, Serialize};

/// Preset category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresetCategory {
    Wallpaper,
    Social,
    Foundry,
}

/// Named target resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub category: PresetCategory,
}

const fn preset(
    id: &'static str,
    name: &'static str,
    width: u32,
    height: u32,
    category: PresetCategory,
) -> Preset {
    Preset { id, name, width, height, category }
}

/// Every known preset, in display order
pub const PRESETS: &[Preset] = &[
    preset("hd", "HD (720p)", 1280, 720, PresetCategory::Wallpaper),
    preset("fhd", "Full HD (1080p)", 1920, 1080, PresetCategory::Wallpaper),
    preset("qhd", "QHD (1440p)", 2560, 1440, PresetCategory::Wallpaper),
    preset("4k", "4K (2160p)", 3840, 2160, PresetCategory::Wallpaper),
    preset("instagram", "Instagram", 1080, 1080, PresetCategory::Social),
    preset("twitter", "Twitter Header", 1500, 500, PresetCategory::Social),
    preset("youtube", "YouTube Thumb", 1280, 720, PresetCategory::Social),
    // 100px per grid square
    preset("foundry-20x20", "Foundry 20×20", 2000, 2000, PresetCategory::Foundry),
    preset("foundry-30x30", "Foundry 30×30", 3000, 3000, PresetCategory::Foundry),
    preset("foundry-40x40", "Foundry 40×40", 4000, 4000, PresetCategory::Foundry),
    preset("foundry-32x18", "Foundry 32×18 (16:9)", 3200, 1800, PresetCategory::Foundry),
    preset("foundry-64x32", "Foundry 64×32 (16:9)", 6400, 3200, PresetCategory::Foundry),
];

/// Look up a preset by id. `custom` and unknown ids resolve to `None`.
pub fn get_preset_by_id(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.id == id)
}

pub fn presets_in_category(category: PresetCategory) -> Vec<&'static Preset> {
    PRESETS.iter().filter(|p| p.category == category).collect()
}

/// Named aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AspectRatio {
    pub id: &'static str,
    pub name: &'static str,
    /// Width divided by height, `None` for `custom`
    pub ratio: Option<f64>,
}

pub const ASPECT_RATIOS: &[AspectRatio] = &[
    AspectRatio { id: "16:9", name: "16:9", ratio: Some(16.0 / 9.0) },
    AspectRatio { id: "16:10", name: "16:10", ratio: Some(16.0 / 10.0) },
    AspectRatio { id: "21:9", name: "21:9 Ultrawide", ratio: Some(21.0 / 9.0) },
    AspectRatio { id: "32:9", name: "32:9 Super Ultrawide", ratio: Some(32.0 / 9.0) },
    AspectRatio { id: "4:3", name: "4:3", ratio: Some(4.0 / 3.0) },
    AspectRatio { id: "3:2", name: "3:2", ratio: Some(3.0 / 2.0) },
    AspectRatio { id: "1:1", name: "1:1", ratio: Some(1.0) },
    AspectRatio { id: "custom", name: "Custom", ratio: None },
];

pub fn get_aspect_ratio(id: &str) -> Option<&'static AspectRatio> {
    ASPECT_RATIOS.iter().find(|a| a.id == id)
}

/// Export format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpg,
    Webp,
    Avif,
    Bmp,
    Ico,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        Self::Png,
        Self::Jpg,
        Self::Webp,
        Self::Ico,
        Self::Bmp,
        Self::Avif,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "bmp" => Some(Self::Bmp),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Bmp => "bmp",
            Self::Ico => "ico",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpg => "JPG",
            Self::Webp => "WebP",
            Self::Avif => "AVIF",
            Self::Bmp => "BMP",
            Self::Ico => "ICO",
        }
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        self.id()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Bmp => "image/bmp",
            Self::Ico => "image/x-icon",
        }
    }

    /// Whether the encoder honours a lossy quality setting
    pub fn supports_quality(&self) -> bool {
        matches!(self, Self::Jpg | Self::Webp | Self::Avif)
    }
}

/// Human-readable byte size: `0 B`, `512 B`, `1.5 KB`, `2.25 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);

    // Two decimals at most, trailing zeros dropped
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exp])
}

pub fn format_dimensions(width: u32, height: u32) -> String {
    format!("{} × {}", width, height)
}
