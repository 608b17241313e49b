//! Asset Studio - Image Composition and Export Pipeline
//!
//! Asset Studio turns one source image into wallpapers, social banners and
//! tabletop map assets:
//!
//! - **Presets**: Named output sizes and aspect ratios
//! - **Wallpaper Modes**: Fit over a painted background, crop, or extend
//!   the edges by mirroring, stretching or AI outpainting
//! - **Background Removal**: Optional cutout before composition
//! - **Encoding**: PNG, JPEG, WebP, AVIF, BMP and PNG-in-ICO, with an
//!   optional target file size
//! - **Batch Export**: One ZIP entry per selected preset
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use asset_studio::{AssetStudio, StudioConfig, StudioSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let studio = AssetStudio::new(StudioConfig::default())
//!         .await
//!         .expect("Failed to start studio");
//!
//!     let data = std::fs::read("map.png").unwrap();
//!     studio.load_image(&data, "map.png").await.unwrap();
//!
//!     let result = studio.export().await.unwrap();
//!     std::fs::write(&result.filename, &result.bytes).unwrap();
//! }
//! ```
//!
//! ## Rendering Model
//!
//! Stage 1 (`Compositor::process_image`) prepares the source once per image
//! and removal setting. Stage 2 (`compose_canvas`) is a pure function of the
//! prepared source and a settings snapshot, so it can run for every slider
//! change. `AssetStudio::render_preview` debounces and drops results that a
//! newer image or snapshot has made stale.

pub mod models;
pub mod services;
pub mod settings;
pub mod studio;

// Re-exports
pub use models::{
    get_aspect_ratio, get_preset_by_id, format_dimensions, format_file_size, AspectRatio,
    BackgroundSettings, BackgroundType, BatchSettings, CropData, Drawable, ExportFormat,
    ExtendMode, FitMode, GeneratedImage, HexColor, ImageDimensions, ImageFile,
    OptimizationSettings, Orientation, OutputSettings, PreprocessingSettings, Preset,
    PresetCategory, Rotation, StudioSettings, ToolSettings, WallpaperMode, WallpaperSettings,
    ASPECT_RATIOS, PRESETS,
};

pub use services::{
    calculate_target_dimensions, canvas_to_blob, compose_canvas, export_batch, export_single,
    load_image, optimize_to_target_size, BackgroundRemover, BitmapCache, Canvas, Compositor,
    EncodeError, ExportError, ExportResult, OutpaintError, OutpaintOptions, OutpaintProvider,
    OutpaintService, OutpaintTransport, PreferenceStore, ProcessedSource, ProgressEvent,
    ProgressReporter, RemovalError,
};

pub use settings::StudioConfig;
pub use studio::{AssetStudio, RenderOutcome, StudioError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use image::{DynamicImage, Rgba, RgbaImage};

    fn ramp_image(width: u32, height: u32) -> ImageFile {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8, 255])
        });
        ImageFile::new(
            format!("ramp-{width}x{height}"),
            "scene.png",
            0,
            DynamicImage::ImageRgba8(img),
        )
    }

    fn compositor() -> Compositor {
        Compositor::new(Arc::new(BitmapCache::default()), None)
    }

    #[test]
    fn test_default_settings() {
        let settings = StudioSettings::default();
        assert_eq!(settings.output.preset, "fhd");
        assert_eq!(settings.optimization.quality, 90);
        assert!(!settings.wallpaper.enabled);
        assert_eq!(settings.wallpaper.aspect_ratio, "16:9");
        assert!(StudioConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_fhd_source_passes_through_unchanged() {
        let image = ramp_image(1920, 1080);
        let settings = StudioSettings::default();
        let source = compositor()
            .process_image(&image, &settings.preprocessing, &ProgressReporter::silent())
            .await;

        let canvas = compose_canvas(&source, &settings.wallpaper, &settings.output);
        assert_eq!((canvas.width(), canvas.height()), (1920, 1080));
        assert_eq!(canvas.as_image(), &image.bitmap.to_rgba8());

        let result = export_single(&compositor(), &image, &settings, &ProgressReporter::silent())
            .await
            .unwrap();
        let decoded = image::load_from_memory(&result.bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image.bitmap.to_rgba8());
    }

    #[tokio::test]
    async fn test_fit_on_solid_black() {
        let image = ImageFile::new(
            "solid",
            "solid.png",
            0,
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(800, 600, Rgba([250, 250, 250, 255]))),
        );
        let settings = StudioSettings::default().with_wallpaper(WallpaperSettings {
            enabled: true,
            mode: WallpaperMode::Fit,
            background: BackgroundSettings {
                kind: BackgroundType::Solid,
                solid_color: HexColor::new("#000000"),
                ..BackgroundSettings::default()
            },
            ..WallpaperSettings::default()
        });

        let source = compositor()
            .process_image(&image, &settings.preprocessing, &ProgressReporter::silent())
            .await;
        let canvas = compose_canvas(&source, &settings.wallpaper, &settings.output);

        assert_eq!((canvas.width(), canvas.height()), (1920, 1080));
        for x in [0, 120, 239, 1680, 1800, 1919] {
            assert_eq!(canvas.pixel(x, 540), Rgba([0, 0, 0, 255]), "bar at x={}", x);
        }
        for x in [241, 960, 1678] {
            assert!(canvas.pixel(x, 540).0[0] >= 249, "image at x={}", x);
        }
    }

    #[tokio::test]
    async fn test_mirror_extend_bands_are_not_flat() {
        let image = ramp_image(400, 1080);
        let settings = StudioSettings::default().with_wallpaper(WallpaperSettings {
            enabled: true,
            mode: WallpaperMode::Extend,
            extend_mode: ExtendMode::Mirror,
            ..WallpaperSettings::default()
        });

        let source = compositor()
            .process_image(&image, &settings.preprocessing, &ProgressReporter::silent())
            .await;
        let canvas = compose_canvas(&source, &settings.wallpaper, &settings.output);

        // Image occupies 760..1160; bands on either side carry mirrored content
        let left: Vec<u8> = (0..760).step_by(76).map(|x| canvas.pixel(x, 10).0[0]).collect();
        assert!(left.windows(2).any(|w| w[0] != w[1]));
        // Next to the image the band mirrors the image's own edge column
        assert!(canvas.pixel(759, 10).0[0] < 10);
        assert!(canvas.as_image().pixels().all(|p| p.0[3] == 255));
    }

    #[tokio::test]
    async fn test_batch_fhd_and_4k_jpeg() {
        let image = ramp_image(320, 180);
        let settings = StudioSettings::default()
            .with_batch(BatchSettings {
                enabled: true,
                selected_presets: vec!["fhd".into(), "4k".into()],
            })
            .with_optimization(OptimizationSettings {
                format: ExportFormat::Jpg,
                ..OptimizationSettings::default()
            });

        let archive = export_batch(&compositor(), &image, &settings, &ProgressReporter::silent())
            .await
            .unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 2);
        let first = zip.by_index(0).unwrap().name().to_string();
        let second = zip.by_index(1).unwrap().name().to_string();
        assert_eq!(first, "scene_fhd.jpg");
        assert_eq!(second, "scene_4k.jpg");
    }

    #[tokio::test]
    async fn test_compose_twice_is_pixel_identical() {
        let image = ramp_image(300, 500);
        let settings = StudioSettings::default().with_wallpaper(WallpaperSettings {
            enabled: true,
            orientation: Orientation::Vertical,
            ..WallpaperSettings::default()
        });
        let source = compositor()
            .process_image(&image, &settings.preprocessing, &ProgressReporter::silent())
            .await;

        let a = compose_canvas(&source, &settings.wallpaper, &settings.output);
        let b = compose_canvas(&source, &settings.wallpaper, &settings.output);
        assert_eq!((a.width(), a.height()), (1080, 1920));
        assert_eq!(a, b);
    }
}
