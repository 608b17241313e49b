//! Studio Settings Models
//!
//! Immutable snapshots describing how a source image is composed and
//! exported. Every change produces a new snapshot.

use std::collections::BTreeSet;

use image::Rgba;
use serde::{Deserialize, Serialize};

use super::image::{CropData, GeneratedImage, ImageFile};
use super::preset::ExportFormat;

/// Output orientation for wallpaper mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// How the source fills the wallpaper canvas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperMode {
    /// Contain over a painted background
    #[default]
    Fit,
    /// Crop rectangle or centered cover
    Crop,
    /// Fill the side bands
    Extend,
}

impl WallpaperMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Crop => "crop",
            Self::Extend => "extend",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    #[default]
    Blur,
    Solid,
    Gradient,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtendMode {
    #[default]
    Mirror,
    Stretch,
    Ai,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Contain,
    Cover,
}

/// `#rrggbb` color as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexColor(pub String);

impl HexColor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse `#rgb` or `#rrggbb`. Anything else yields `None`.
    pub fn to_rgba(&self) -> Option<Rgba<u8>> {
        let hex = self.0.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();

        match hex.len() {
            6 => Some(Rgba([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            ])),
            3 => {
                let mut out = [255u8; 4];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    out[i] = v * 17;
                }
                Some(Rgba(out))
            }
            _ => None,
        }
    }

    /// Parsed color, black when malformed
    pub fn to_rgba_or_black(&self) -> Rgba<u8> {
        self.to_rgba().unwrap_or(Rgba([0, 0, 0, 255]))
    }
}

impl From<&str> for HexColor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Background painted behind the foreground in `fit` mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSettings {
    #[serde(rename = "type")]
    pub kind: BackgroundType,
    /// Blur intensity (0-100)
    pub blur_intensity: u8,
    pub solid_color: HexColor,
    pub gradient_start: HexColor,
    pub gradient_end: HexColor,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            kind: BackgroundType::Blur,
            blur_intensity: 50,
            solid_color: HexColor::new("#000000"),
            gradient_start: HexColor::new("#1a1a2e"),
            gradient_end: HexColor::new("#16213e"),
        }
    }
}

/// Wallpaper (re-layout) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperSettings {
    pub enabled: bool,
    pub orientation: Orientation,
    pub mode: WallpaperMode,
    /// Aspect ratio id (`16:9`, `custom`, ...)
    pub aspect_ratio: String,
    pub custom_width: Option<u32>,
    pub custom_height: Option<u32>,
    pub background: BackgroundSettings,
    /// Only meaningful when `mode` is `extend`
    pub extend_mode: ExtendMode,
    /// Result of a finished AI extension; never persisted
    #[serde(skip)]
    pub ai_generated_image: Option<GeneratedImage>,
    pub crop: Option<CropData>,
}

impl Default for WallpaperSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            orientation: Orientation::Horizontal,
            mode: WallpaperMode::Fit,
            aspect_ratio: "16:9".to_string(),
            custom_width: None,
            custom_height: None,
            background: BackgroundSettings::default(),
            extend_mode: ExtendMode::Mirror,
            ai_generated_image: None,
            crop: None,
        }
    }
}

/// Output size settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    /// Preset id, or `custom`
    pub preset: String,
    pub custom_width: u32,
    pub custom_height: u32,
    pub maintain_aspect: bool,
    pub fit_mode: FitMode,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            preset: "fhd".to_string(),
            custom_width: 1920,
            custom_height: 1080,
            maintain_aspect: true,
            fit_mode: FitMode::Contain,
        }
    }
}

impl OutputSettings {
    /// Switch to custom dimensions; when `maintain_aspect` is on and a source
    /// is known, the other side follows the source ratio.
    pub fn with_custom_width(&self, width: u32, source: Option<&ImageFile>) -> Self {
        let mut next = self.clone();
        next.preset = "custom".to_string();
        next.custom_width = width;
        if let Some(img) = source.filter(|_| self.maintain_aspect && width > 0) {
            if img.width > 0 {
                let ratio = img.width as f64 / img.height as f64;
                next.custom_height = (width as f64 / ratio).round() as u32;
            }
        }
        next
    }

    pub fn with_custom_height(&self, height: u32, source: Option<&ImageFile>) -> Self {
        let mut next = self.clone();
        next.preset = "custom".to_string();
        next.custom_height = height;
        if let Some(img) = source.filter(|_| self.maintain_aspect && height > 0) {
            if img.height > 0 {
                let ratio = img.width as f64 / img.height as f64;
                next.custom_width = (height as f64 * ratio).round() as u32;
            }
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessingSettings {
    pub remove_background: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSettings {
    pub format: ExportFormat,
    /// Quality (1-100)
    pub quality: u8,
    pub target_size_enabled: bool,
    pub target_size_mb: f64,
    /// Re-encoding from pixels never carries metadata over, so this is
    /// always honoured
    pub remove_metadata: bool,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 90,
            target_size_enabled: false,
            target_size_mb: 5.0,
            remove_metadata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchSettings {
    pub enabled: bool,
    /// Preset ids in export order
    pub selected_presets: Vec<String>,
}

impl BatchSettings {
    /// Toggle a preset, keeping first-selection order and no duplicates
    pub fn toggled(&self, preset_id: &str) -> Self {
        let mut next = self.clone();
        if let Some(pos) = next.selected_presets.iter().position(|p| p == preset_id) {
            next.selected_presets.remove(pos);
        } else {
            next.selected_presets.push(preset_id.to_string());
        }
        next
    }

    pub fn unique_presets(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.selected_presets
            .iter()
            .filter(|p| seen.insert(p.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Aggregate snapshot passed into every compose/encode call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudioSettings {
    pub wallpaper: WallpaperSettings,
    pub output: OutputSettings,
    pub preprocessing: PreprocessingSettings,
    pub optimization: OptimizationSettings,
    pub batch: BatchSettings,
}

impl StudioSettings {
    pub fn with_wallpaper(&self, wallpaper: WallpaperSettings) -> Self {
        Self { wallpaper, ..self.clone() }
    }

    pub fn with_output(&self, output: OutputSettings) -> Self {
        Self { output, ..self.clone() }
    }

    pub fn with_preprocessing(&self, preprocessing: PreprocessingSettings) -> Self {
        Self { preprocessing, ..self.clone() }
    }

    pub fn with_optimization(&self, optimization: OptimizationSettings) -> Self {
        Self { optimization, ..self.clone() }
    }

    pub fn with_batch(&self, batch: BatchSettings) -> Self {
        Self { batch, ..self.clone() }
    }

    /// Wallpaper mode suffix used in export filenames
    pub fn mode_suffix(&self) -> Option<&'static str> {
        self.wallpaper.enabled.then(|| self.wallpaper.mode.as_str())
    }
}

/// Rotation for the basic tool pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    None,
    #[serde(rename = "90")]
    Cw90,
    #[serde(rename = "180")]
    Half,
    #[serde(rename = "270")]
    Cw270,
}

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Half => 180,
            Self::Cw270 => 270,
        }
    }

    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Self::Cw90,
            180 => Self::Half,
            270 => Self::Cw270,
            _ => Self::None,
        }
    }

    pub fn clockwise(&self) -> Self {
        Self::from_degrees(self.degrees() as i32 + 90)
    }

    pub fn counter_clockwise(&self) -> Self {
        Self::from_degrees(self.degrees() as i32 + 270)
    }

    pub fn is_quarter_turn(&self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeSettings {
    /// Output width, 0 keeps the post-rotation width
    pub width: u32,
    /// Output height, 0 keeps the post-rotation height
    pub height: u32,
    pub maintain_aspect: bool,
}

/// Settings of the basic rotate/flip/crop/resize tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSettings {
    pub rotation: Rotation,
    pub flip_h: bool,
    pub flip_v: bool,
    pub resize: ResizeSettings,
    pub quality: u8,
    pub format: ExportFormat,
    pub crop: Option<CropData>,
}

impl ToolSettings {
    pub fn for_image(image: Option<&ImageFile>) -> Self {
        Self {
            rotation: Rotation::None,
            flip_h: false,
            flip_v: false,
            resize: ResizeSettings {
                width: image.map(|i| i.width).unwrap_or(1920),
                height: image.map(|i| i.height).unwrap_or(1080),
                maintain_aspect: true,
            },
            quality: 90,
            format: ExportFormat::Png,
            crop: None,
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::for_image(None)
    }
}
