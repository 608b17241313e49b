//! Export
//!
//! Single-file export and the batch archive builder.

use std::io::{Cursor, Write};
use std::sync::LazyLock;

use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::canvas::Canvas;
use super::compositor::{compose_canvas, Compositor, ProcessedSource};
use super::encoder::{canvas_to_blob, optimize_to_target_size, EncodeError};
use super::progress::ProgressReporter;
use crate::models::{get_preset_by_id, ExportFormat, ImageFile, OutputSettings, Preset, StudioSettings};

static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^/.]+$").expect("extension pattern is valid"));

/// Export error
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// A finished single export
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub format: ExportFormat,
    pub size: u64,
    /// Quality actually used (differs from the setting after a size search)
    pub quality: u8,
}

/// `<base>[_<mode>]_<preset id or WxH>.<ext>`
pub fn generate_filename(
    original_name: &str,
    preset: Option<&Preset>,
    width: u32,
    height: u32,
    format: ExportFormat,
    mode: Option<&str>,
) -> String {
    let base = EXTENSION.replace(original_name, "");
    let mode_suffix = mode.map(|m| format!("_{}", m)).unwrap_or_default();
    let size_suffix = match preset {
        Some(p) => format!("_{}", p.id),
        None => format!("_{}x{}", width, height),
    };
    format!("{}{}{}.{}", base, mode_suffix, size_suffix, format.extension())
}

/// Stage 2 plus encoding for an already processed source
pub fn encode_export(
    source: &ProcessedSource,
    name: &str,
    settings: &StudioSettings,
) -> Result<ExportResult, ExportError> {
    let canvas = compose_canvas(source, &settings.wallpaper, &settings.output);
    let optimization = &settings.optimization;
    let format = optimization.format;

    let (bytes, quality) = if optimization.target_size_enabled && format != ExportFormat::Ico {
        let optimized = optimize_to_target_size(
            &canvas,
            optimization.target_size_mb,
            format,
            optimization.quality,
        )?;
        (optimized.bytes, optimized.quality)
    } else {
        (canvas_to_blob(&canvas, format, optimization.quality)?, optimization.quality)
    };

    let filename = generate_filename(
        name,
        get_preset_by_id(&settings.output.preset),
        canvas.width(),
        canvas.height(),
        format,
        settings.mode_suffix(),
    );

    tracing::info!("Exported {} ({} bytes)", filename, bytes.len());

    Ok(ExportResult {
        size: bytes.len() as u64,
        bytes,
        filename,
        width: canvas.width(),
        height: canvas.height(),
        format,
        quality,
    })
}

/// Stage 1, Stage 2 and encode for one file
pub async fn export_single(
    compositor: &Compositor,
    image: &ImageFile,
    settings: &StudioSettings,
    progress: &ProgressReporter,
) -> Result<ExportResult, ExportError> {
    let source = compositor
        .process_image(image, &settings.preprocessing, progress)
        .await;
    encode_export(&source, &image.name, settings)
}

/// Build the batch archive from an already processed source.
///
/// Presets are exported in first-selection order, each id once. Unknown ids
/// are skipped, and an entry that fails to encode is logged and left out
/// without losing the entries written before it.
pub async fn build_batch_archive(
    source: &ProcessedSource,
    name: &str,
    settings: &StudioSettings,
    progress: &ProgressReporter,
) -> Result<Vec<u8>, ExportError> {
    write_batch_archive(source, name, settings, progress, canvas_to_blob).await
}

async fn write_batch_archive<E>(
    source: &ProcessedSource,
    name: &str,
    settings: &StudioSettings,
    progress: &ProgressReporter,
    encode: E,
) -> Result<Vec<u8>, ExportError>
where
    E: Fn(&Canvas, ExportFormat, u8) -> Result<Vec<u8>, EncodeError>,
{
    let preset_ids = settings.batch.unique_presets();
    let total = preset_ids.len();
    let format = settings.optimization.format;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (index, preset_id) in preset_ids.into_iter().enumerate() {
        let Some(preset) = get_preset_by_id(preset_id) else {
            tracing::debug!("Skipping unknown preset {}", preset_id);
            continue;
        };

        let output = OutputSettings {
            preset: preset.id.to_string(),
            custom_width: preset.width,
            custom_height: preset.height,
            ..settings.output.clone()
        };
        let canvas = compose_canvas(source, &settings.wallpaper, &output);

        match encode(&canvas, format, settings.optimization.quality) {
            Ok(bytes) => {
                let filename = generate_filename(
                    name,
                    Some(preset),
                    canvas.width(),
                    canvas.height(),
                    format,
                    settings.mode_suffix(),
                );
                zip.start_file(filename.as_str(), entry_options())?;
                zip.write_all(&bytes)?;
            }
            Err(e) => {
                tracing::warn!("Skipping {} in batch: {}", preset.id, e);
            }
        }

        progress.batch(index + 1, total);
        tokio::task::yield_now().await;
    }

    let archive = zip.finish()?.into_inner();
    tracing::info!("Built batch archive ({} bytes)", archive.len());
    Ok(archive)
}

/// Run Stage 1 once and build the batch archive
pub async fn export_batch(
    compositor: &Compositor,
    image: &ImageFile,
    settings: &StudioSettings,
    progress: &ProgressReporter,
) -> Result<Vec<u8>, ExportError> {
    let source = compositor
        .process_image(image, &settings.preprocessing, progress)
        .await;
    build_batch_archive(&source, &image.name, settings, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use image::{DynamicImage, Rgba, RgbaImage};

    use crate::models::{BatchSettings, OptimizationSettings, WallpaperMode, WallpaperSettings};
    use crate::services::cache::BitmapCache;
    use crate::services::progress::ProgressEvent;

    fn photo() -> ImageFile {
        let img = RgbaImage::from_fn(64, 48, |x, y| Rgba([(x * 4) as u8, (y * 5) as u8, 90, 255]));
        ImageFile::new("photo", "holiday.photo.png", 0, DynamicImage::ImageRgba8(img))
    }

    fn entry_names(archive: Vec<u8>) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_generate_filename() {
        let fhd = get_preset_by_id("fhd");
        assert_eq!(
            generate_filename("map.final.png", fhd, 1920, 1080, ExportFormat::Jpg, None),
            "map.final_fhd.jpg"
        );
        assert_eq!(
            generate_filename("map", None, 800, 600, ExportFormat::Webp, Some("extend")),
            "map_extend_800x600.webp"
        );
    }

    #[tokio::test]
    async fn test_export_single_names_and_sizes() {
        let compositor = Compositor::new(Arc::new(BitmapCache::default()), None);
        let settings = StudioSettings::default().with_wallpaper(WallpaperSettings {
            enabled: true,
            mode: WallpaperMode::Extend,
            ..WallpaperSettings::default()
        });

        let result = export_single(&compositor, &photo(), &settings, &ProgressReporter::silent())
            .await
            .unwrap();
        assert_eq!(result.filename, "holiday.photo_extend_fhd.png");
        assert_eq!((result.width, result.height), (1920, 1080));
        assert_eq!(result.size, result.bytes.len() as u64);
        assert_eq!(&result.bytes[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_export_single_honours_target_size() {
        let compositor = Compositor::new(Arc::new(BitmapCache::default()), None);
        let settings = StudioSettings::default().with_optimization(OptimizationSettings {
            format: ExportFormat::Jpg,
            quality: 95,
            target_size_enabled: true,
            target_size_mb: 0.0,
            ..OptimizationSettings::default()
        });

        let result = export_single(&compositor, &photo(), &settings, &ProgressReporter::silent())
            .await
            .unwrap();
        assert_eq!(result.quality, 10);
        assert_eq!(result.filename, "holiday.photo_fhd.jpg");
    }

    #[tokio::test]
    async fn test_batch_archive_entries_and_progress() {
        let compositor = Compositor::new(Arc::new(BitmapCache::default()), None);
        let settings = StudioSettings::default()
            .with_batch(BatchSettings {
                enabled: true,
                selected_presets: vec!["fhd".into(), "nope".into(), "4k".into()],
            })
            .with_optimization(OptimizationSettings {
                format: ExportFormat::Jpg,
                ..OptimizationSettings::default()
            });
        let (reporter, mut rx) = ProgressReporter::channel();

        let archive = export_batch(&compositor, &photo(), &settings, &reporter)
            .await
            .unwrap();
        let names = entry_names(archive);
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("_fhd.jpg"));
        assert!(names[1].ends_with("_4k.jpg"));

        let mut batch_events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::Batch { current, total } = event {
                batch_events.push((current, total));
            }
        }
        assert_eq!(batch_events, vec![(1, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_batch_repeated_preset_is_exported_once() {
        let compositor = Compositor::new(Arc::new(BitmapCache::default()), None);
        let settings = StudioSettings::default().with_batch(BatchSettings {
            enabled: true,
            selected_presets: vec!["hd".into(), "fhd".into(), "hd".into()],
        });
        let (reporter, mut rx) = ProgressReporter::channel();

        let archive = export_batch(&compositor, &photo(), &settings, &reporter)
            .await
            .unwrap();
        assert_eq!(
            entry_names(archive),
            vec!["holiday.photo_hd.png", "holiday.photo_fhd.png"]
        );

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::Batch { current, total } = event {
                last = Some((current, total));
            }
        }
        assert_eq!(last, Some((2, 2)));
    }

    #[tokio::test]
    async fn test_batch_keeps_entries_before_a_failure() {
        let source = ProcessedSource {
            source_key: "s".to_string(),
            original: RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])).into(),
            processed: RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])).into(),
            background_removed: false,
        };
        let settings = StudioSettings::default().with_batch(BatchSettings {
            enabled: true,
            selected_presets: vec!["hd".into(), "4k".into(), "instagram".into()],
        });
        let fail_on_4k = |canvas: &Canvas, format: ExportFormat, quality: u8| {
            if canvas.width() == 3840 {
                Err(EncodeError::UnsupportedFormat("4k".to_string()))
            } else {
                canvas_to_blob(canvas, format, quality)
            }
        };

        let archive = write_batch_archive(
            &source,
            "x.png",
            &settings,
            &ProgressReporter::silent(),
            fail_on_4k,
        )
        .await
        .unwrap();
        assert_eq!(entry_names(archive), vec!["x_hd.png", "x_instagram.png"]);
    }

    #[tokio::test]
    async fn test_batch_skips_entries_that_fail_to_encode() {
        let source = ProcessedSource {
            source_key: "s".to_string(),
            original: RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])).into(),
            processed: RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])).into(),
            background_removed: false,
        };
        // Zero-width custom wallpaper: every entry encodes an empty canvas
        let settings = StudioSettings::default()
            .with_wallpaper(WallpaperSettings {
                enabled: true,
                aspect_ratio: "custom".to_string(),
                custom_width: Some(0),
                custom_height: Some(10),
                ..WallpaperSettings::default()
            })
            .with_batch(BatchSettings {
                enabled: true,
                selected_presets: vec!["hd".into()],
            });

        let archive = build_batch_archive(&source, "x.png", &settings, &ProgressReporter::silent())
            .await
            .unwrap();
        assert!(entry_names(archive).is_empty());
    }
}
