//! Asset Studio Session
//!
//! Owns the services and the state of one editing session: the current
//! image, the current settings snapshot and a generation counter that
//! detects stale renders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::models::{GeneratedImage, ImageFile, PreprocessingSettings, StudioSettings};
use crate::services::{
    build_batch_archive, calculate_target_dimensions, compose_canvas, encode_export,
    load_image, BackgroundRemover, BitmapCache, Canvas, Compositor, ExportError, ExportResult,
    HttpOutpaintTransport, OutpaintError, OutpaintOptions, OutpaintService, OutpaintTransport,
    PreferenceError, PreferenceStore, ProcessedSource, ProgressReceiver, ProgressReporter,
    RemoteBackgroundRemover,
};
use crate::settings::StudioConfig;

/// Session error
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("No image loaded")]
    NoImage,
    #[error("The image changed while the request was running")]
    ImageChanged,
    #[error("The output size changed while the request was running")]
    TargetChanged,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Outpaint(#[from] OutpaintError),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
}

/// Result of a preview render
#[derive(Debug)]
pub enum RenderOutcome {
    Rendered(Canvas),
    /// A newer image or settings snapshot arrived; nothing to paint
    Superseded,
}

impl RenderOutcome {
    pub fn canvas(self) -> Option<Canvas> {
        match self {
            Self::Rendered(canvas) => Some(canvas),
            Self::Superseded => None,
        }
    }
}

struct SessionState {
    image: Option<ImageFile>,
    settings: Arc<StudioSettings>,
    generation: u64,
}

impl SessionState {
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

type StageOneKey = (String, bool);

/// One editing session
pub struct AssetStudio {
    config: StudioConfig,
    compositor: Arc<Compositor>,
    outpaint: Arc<OutpaintService>,
    preferences: Arc<PreferenceStore>,
    progress: ProgressReporter,
    state: RwLock<SessionState>,
    processed: RwLock<HashMap<StageOneKey, ProcessedSource>>,
}

impl AssetStudio {
    /// Create a session talking to the configured remote services
    pub async fn new(config: StudioConfig) -> Result<Self, StudioError> {
        let preferences = if config.preferences_path.trim().is_empty() {
            PreferenceStore::in_memory()
        } else {
            PreferenceStore::open(&config.preferences_path).await?
        };

        let remover = config.remove_bg_enabled().then(|| {
            Arc::new(RemoteBackgroundRemover::new(
                &config.remove_bg_endpoint,
                config.request_timeout_secs,
            )) as Arc<dyn BackgroundRemover>
        });
        let transport = Arc::new(HttpOutpaintTransport::new(
            &config.outpaint_endpoint,
            config.request_timeout_secs,
        ));

        Ok(Self::with_services(config, remover, transport, Arc::new(preferences)))
    }

    /// Create a session with explicit backends
    pub fn with_services(
        config: StudioConfig,
        remover: Option<Arc<dyn BackgroundRemover>>,
        transport: Arc<dyn OutpaintTransport>,
        preferences: Arc<PreferenceStore>,
    ) -> Self {
        let cache = Arc::new(BitmapCache::with_ttl_secs(config.cache_ttl_secs));
        let compositor = Arc::new(Compositor::new(cache, remover));
        let outpaint = Arc::new(OutpaintService::new(
            transport,
            Arc::clone(&preferences),
            config.default_ai_provider,
        ));

        Self {
            config,
            compositor,
            outpaint,
            preferences,
            progress: ProgressReporter::silent(),
            state: RwLock::new(SessionState {
                image: None,
                settings: Arc::new(StudioSettings::default()),
                generation: 0,
            }),
            processed: RwLock::new(HashMap::new()),
        }
    }

    /// Start delivering progress events to the returned receiver.
    ///
    /// There is one observer at a time: a new subscription closes the
    /// channel of the previous one.
    pub fn subscribe_progress(&mut self) -> ProgressReceiver {
        let (reporter, receiver) = ProgressReporter::channel();
        self.progress = reporter;
        receiver
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    // Session state

    /// Decode and select an uploaded image
    pub async fn load_image(&self, data: &[u8], name: &str) -> Result<ImageFile, StudioError> {
        let image = load_image(data, name)?;
        self.set_image(image.clone()).await;
        Ok(image)
    }

    /// Select an already decoded image
    pub async fn set_image(&self, image: ImageFile) {
        let previous = {
            let mut state = self.state.write().await;
            state.bump();
            state.image.replace(image)
        };
        if let Some(old) = previous {
            self.forget(&old.source_key).await;
        }
    }

    pub async fn clear_image(&self) {
        let previous = {
            let mut state = self.state.write().await;
            state.bump();
            state.image.take()
        };
        if let Some(old) = previous {
            self.forget(&old.source_key).await;
        }
    }

    async fn forget(&self, source_key: &str) {
        let still_current = self
            .state
            .read()
            .await
            .image
            .as_ref()
            .is_some_and(|img| img.source_key == source_key);
        if still_current {
            return;
        }

        self.processed.write().await.retain(|(key, _), _| key != source_key);
        self.compositor.cache().invalidate(source_key).await;
    }

    pub async fn image(&self) -> Option<ImageFile> {
        self.state.read().await.image.clone()
    }

    pub async fn settings(&self) -> Arc<StudioSettings> {
        Arc::clone(&self.state.read().await.settings)
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Replace the settings snapshot; returns the new generation
    pub async fn update_settings(&self, settings: StudioSettings) -> u64 {
        let mut state = self.state.write().await;
        state.settings = Arc::new(settings);
        state.bump()
    }

    async fn snapshot(&self) -> Result<(u64, ImageFile, Arc<StudioSettings>), StudioError> {
        let state = self.state.read().await;
        let image = state.image.clone().ok_or(StudioError::NoImage)?;
        Ok((state.generation, image, Arc::clone(&state.settings)))
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.state.read().await.generation == generation
    }

    /// Stage 1, reusing the result for the same source and removal flag.
    /// Fallbacks after a failed removal are not kept so a later call retries,
    /// and neither are results for an image that was replaced meanwhile.
    async fn processed_source(
        &self,
        image: &ImageFile,
        preprocessing: &PreprocessingSettings,
    ) -> ProcessedSource {
        let key = (image.source_key.clone(), preprocessing.remove_background);
        if let Some(source) = self.processed.read().await.get(&key) {
            return source.clone();
        }

        let source = self
            .compositor
            .process_image(image, preprocessing, &self.progress)
            .await;

        if source.background_removed || !preprocessing.remove_background {
            // Held across the insert so a concurrent image swap forgets it
            let state = self.state.read().await;
            let still_current = state
                .image
                .as_ref()
                .is_some_and(|current| current.source_key == image.source_key);
            if still_current {
                self.processed.write().await.insert(key, source.clone());
            } else {
                tracing::debug!("Dropping Stage 1 result for replaced image {}", image.source_key);
            }
        }
        source
    }

    // Rendering

    /// Debounce, then run both stages for the current snapshot.
    ///
    /// Returns `Superseded` as soon as a newer image or settings snapshot
    /// shows up, so only the latest request ever paints.
    pub async fn render_preview(&self) -> Result<RenderOutcome, StudioError> {
        let (generation, image, settings) = self.snapshot().await?;

        if self.config.debounce_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.debounce_ms)).await;
            if !self.is_current(generation).await {
                return Ok(RenderOutcome::Superseded);
            }
        }

        let source = self.processed_source(&image, &settings.preprocessing).await;
        if !self.is_current(generation).await {
            tracing::debug!("Discarding stale Stage 1 result for generation {}", generation);
            return Ok(RenderOutcome::Superseded);
        }

        let canvas = compose_canvas(&source, &settings.wallpaper, &settings.output);
        if !self.is_current(generation).await {
            return Ok(RenderOutcome::Superseded);
        }

        Ok(RenderOutcome::Rendered(canvas))
    }

    // Export

    pub async fn export(&self) -> Result<ExportResult, StudioError> {
        let (_, image, settings) = self.snapshot().await?;
        let source = self.processed_source(&image, &settings.preprocessing).await;
        Ok(encode_export(&source, &image.name, &settings)?)
    }

    /// Archive with one entry per selected preset
    pub async fn export_batch(&self) -> Result<Vec<u8>, StudioError> {
        let (_, image, settings) = self.snapshot().await?;
        let source = self.processed_source(&image, &settings.preprocessing).await;
        Ok(build_batch_archive(&source, &image.name, &settings, &self.progress).await?)
    }

    // AI extension

    /// Generate an AI extension at the current target size and attach it to
    /// a new settings snapshot.
    ///
    /// Fails without attaching anything when the image or the target size
    /// changed while the request was running.
    pub async fn generate_ai_extension(
        &self,
        options: OutpaintOptions,
    ) -> Result<GeneratedImage, StudioError> {
        let (_, image, settings) = self.snapshot().await?;
        let target = calculate_target_dimensions(&settings.wallpaper, &settings.output);

        let generated = self
            .outpaint
            .generate_ai_expansion(&image.drawable(), target.width, target.height, &options)
            .await?;

        let mut state = self.state.write().await;
        let same_image = state
            .image
            .as_ref()
            .is_some_and(|current| current.source_key == image.source_key);
        if !same_image {
            return Err(StudioError::ImageChanged);
        }
        let current = &state.settings;
        if calculate_target_dimensions(&current.wallpaper, &current.output) != target {
            tracing::debug!("Discarding AI extension generated for {:?}", target);
            return Err(StudioError::TargetChanged);
        }

        let mut wallpaper = state.settings.wallpaper.clone();
        wallpaper.ai_generated_image = Some(generated.clone());
        state.settings = Arc::new(state.settings.with_wallpaper(wallpaper));
        state.bump();

        Ok(generated)
    }

    /// Drop the attached AI result, back to the placeholder preview
    pub async fn discard_ai_extension(&self) -> u64 {
        let mut state = self.state.write().await;
        let mut wallpaper = state.settings.wallpaper.clone();
        wallpaper.ai_generated_image = None;
        state.settings = Arc::new(state.settings.with_wallpaper(wallpaper));
        state.bump()
    }

    /// Remember the strength of the attached generation when the user liked it
    pub async fn record_ai_feedback(&self, good: bool) -> Result<bool, StudioError> {
        let used = match &self.settings().await.wallpaper.ai_generated_image {
            Some(generated) => generated.strength,
            None => self.preferences.ai_strength().await,
        };
        Ok(self.preferences.record_ai_feedback(good, used).await?)
    }

    // Maintenance

    /// Evict cached bitmaps past their TTL
    pub async fn sweep_cache(&self) -> usize {
        self.compositor.cache().sweep_expired().await
    }
}
