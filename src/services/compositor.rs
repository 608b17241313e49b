//! Compositor
//!
//! Stage 1 prepares the source (cached original plus optional cutout),
//! Stage 2 paints it onto a canvas of the target size. Stage 2 only reads
//! what Stage 1 produced and can be re-run for every settings change.

use std::sync::Arc;

use image::Rgba;

use super::cache::BitmapCache;
use super::canvas::{
    apply_crop, draw_blurred_background, draw_centered_image, draw_gradient_background,
    draw_mirrored_edges, draw_solid_background, draw_stretched_edges, Canvas, DestRect,
};
use super::geometry::calculate_target_dimensions;
use super::progress::ProgressReporter;
use super::removal::BackgroundRemover;
use crate::models::{
    BackgroundType, Drawable, ExtendMode, FitMode, ImageFile, OutputSettings,
    PreprocessingSettings, WallpaperMode, WallpaperSettings,
};

/// Fill shown in `extend` + `ai` mode until a generation is attached
pub const AI_PLACEHOLDER: Rgba<u8> = Rgba([17, 17, 17, 255]);

/// Stage 1 output
#[derive(Debug, Clone)]
pub struct ProcessedSource {
    /// Identity of the source this was built from
    pub source_key: String,
    /// Unmodified bitmap (used for blurred backgrounds)
    pub original: Drawable,
    /// Foreground: the cutout, or the original when removal was off or failed
    pub processed: Drawable,
    pub background_removed: bool,
}

impl ProcessedSource {
    fn unmodified(source_key: &str, original: Drawable) -> Self {
        Self {
            source_key: source_key.to_string(),
            processed: original.clone(),
            original,
            background_removed: false,
        }
    }
}

/// Two-stage compositor
pub struct Compositor {
    cache: Arc<BitmapCache>,
    remover: Option<Arc<dyn BackgroundRemover>>,
}

impl Compositor {
    pub fn new(cache: Arc<BitmapCache>, remover: Option<Arc<dyn BackgroundRemover>>) -> Self {
        Self { cache, remover }
    }

    pub fn cache(&self) -> &Arc<BitmapCache> {
        &self.cache
    }

    pub fn has_remover(&self) -> bool {
        self.remover.is_some()
    }

    /// Stage 1.
    ///
    /// Background removal failures are not errors: the original is used as
    /// the foreground and the failure is logged.
    pub async fn process_image(
        &self,
        image: &ImageFile,
        preprocessing: &PreprocessingSettings,
        progress: &ProgressReporter,
    ) -> ProcessedSource {
        let bitmap = self
            .cache
            .get_or_insert_with(&image.source_key, || image.bitmap.to_rgba8())
            .await;
        let original = Drawable::Surface(bitmap);

        if !preprocessing.remove_background {
            return ProcessedSource::unmodified(&image.source_key, original);
        }

        let Some(remover) = &self.remover else {
            tracing::warn!("Background removal requested but no remover is configured");
            return ProcessedSource::unmodified(&image.source_key, original);
        };

        let on_progress = |key: &str, current: u64, total: u64| {
            progress.removal(key, current, total);
        };

        let bytes = match remover.remove_background(image, &on_progress).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Background removal failed, using original: {}", e);
                return ProcessedSource::unmodified(&image.source_key, original);
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(cutout) => {
                tracing::debug!("Removed background from {}", image.name);
                ProcessedSource {
                    source_key: image.source_key.clone(),
                    original,
                    processed: Drawable::from(cutout),
                    background_removed: true,
                }
            }
            Err(e) => {
                tracing::warn!("Could not decode cutout, using original: {}", e);
                ProcessedSource::unmodified(&image.source_key, original)
            }
        }
    }
}

/// Stage 2: paint the source onto a new canvas of the target size
pub fn compose_canvas(
    source: &ProcessedSource,
    wallpaper: &WallpaperSettings,
    output: &OutputSettings,
) -> Canvas {
    let target = calculate_target_dimensions(wallpaper, output);
    let mut canvas = Canvas::new(target.width, target.height);

    if let Some(generated) = &wallpaper.ai_generated_image {
        let full = DestRect::new(0.0, 0.0, target.width as f64, target.height as f64);
        canvas.draw_image(&generated.image, full);
        return canvas;
    }

    if !wallpaper.enabled {
        draw_centered_image(&mut canvas, &source.processed, output.fit_mode);
        return canvas;
    }

    match wallpaper.mode {
        WallpaperMode::Fit => {
            let background = &wallpaper.background;
            match background.kind {
                BackgroundType::Blur => {
                    draw_blurred_background(&mut canvas, &source.original, background.blur_intensity)
                }
                BackgroundType::Solid => {
                    draw_solid_background(&mut canvas, background.solid_color.to_rgba_or_black())
                }
                BackgroundType::Gradient => draw_gradient_background(
                    &mut canvas,
                    background.gradient_start.to_rgba_or_black(),
                    background.gradient_end.to_rgba_or_black(),
                ),
            }
            draw_centered_image(&mut canvas, &source.processed, FitMode::Contain);
        }
        WallpaperMode::Crop => match &wallpaper.crop {
            Some(crop) => apply_crop(&mut canvas, &source.processed, crop),
            None => {
                draw_centered_image(&mut canvas, &source.processed, FitMode::Cover);
            }
        },
        WallpaperMode::Extend => match wallpaper.extend_mode {
            ExtendMode::Mirror => draw_mirrored_edges(&mut canvas, &source.processed),
            ExtendMode::Stretch => draw_stretched_edges(&mut canvas, &source.processed),
            ExtendMode::Ai => {
                canvas.fill(AI_PLACEHOLDER);
                draw_centered_image(&mut canvas, &source.processed, FitMode::Contain);
            }
        },
    }

    canvas
}
