//! AI Outpaint
//!
//! Builds the color-hint image and the soft mask for an outpainting model,
//! ships them to the remote service and turns the reply into a
//! `GeneratedImage` the compositor can draw.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops;
use image::Rgba;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::canvas::{centered_rect, draw_centered_image, draw_stretched_edges, Canvas};
use super::encoder::{canvas_to_blob, EncodeError};
use super::preferences::{clamp_strength, PreferenceStore};
use super::remote;
use crate::models::{Drawable, ExportFormat, FitMode, GeneratedImage};

pub const DEFAULT_PROMPT: &str = "seamless horizontal extension of the same scene, natural continuation left and right, no visible seams or borders, single continuous image, consistent art style and lighting, fantasy map, tabletop game map, high quality";

/// Margin kept between the protected region and the source edges
pub const MASK_PADDING: f64 = 15.0;
/// Blur applied to the mask for a soft seam
pub const MASK_BLUR: f32 = 25.0;
/// Replies smaller than this are treated as failures
pub const MIN_RESPONSE_BYTES: usize = 1000;

const MASK_PAINT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const MASK_KEEP: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Outpaint error
#[derive(Debug, thiserror::Error)]
pub enum OutpaintError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Outpaint service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("Outpaint service returned only {0} bytes")]
    PayloadTooSmall(usize),
    #[error("Failed to encode request: {0}")]
    Encode(#[from] EncodeError),
    #[error("Failed to decode generated image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid target size {0}x{1}")]
    InvalidSize(u32, u32),
}

/// Inpainting backend behind the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutpaintProvider {
    #[default]
    Cloudflare,
    Fal,
}

impl OutpaintProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::Fal => "fal",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "cloudflare" => Some(Self::Cloudflare),
            "fal" => Some(Self::Fal),
            _ => None,
        }
    }
}

impl fmt::Display for OutpaintProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller options for a generation
#[derive(Debug, Clone, Default)]
pub struct OutpaintOptions {
    /// Blank or missing falls back to `DEFAULT_PROMPT`
    pub prompt: Option<String>,
    pub provider: Option<OutpaintProvider>,
}

impl OutpaintOptions {
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROMPT)
    }
}

/// Fully prepared request
#[derive(Debug, Clone)]
pub struct OutpaintRequest {
    pub image_png: Vec<u8>,
    pub mask_png: Vec<u8>,
    pub prompt: String,
    pub provider: OutpaintProvider,
    pub strength: f32,
    pub width: u32,
    pub height: u32,
}

/// Raw reply of the remote service
#[derive(Debug, Clone)]
pub struct OutpaintResponse {
    pub status: http::StatusCode,
    pub body: Vec<u8>,
}

/// Sends a prepared request somewhere that can paint it
#[async_trait]
pub trait OutpaintTransport: Send + Sync {
    async fn send(&self, request: OutpaintRequest) -> Result<OutpaintResponse, OutpaintError>;
}

/// Multipart POST to the outpaint proxy
pub struct HttpOutpaintTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOutpaintTransport {
    pub fn new(endpoint: impl Into<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            client: remote::build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }

    fn png_part(bytes: Vec<u8>, name: &'static str) -> Result<Part, OutpaintError> {
        Part::bytes(bytes)
            .file_name(name)
            .mime_str(ExportFormat::Png.mime_type())
            .map_err(|e| OutpaintError::Network(e.to_string()))
    }
}

#[async_trait]
impl OutpaintTransport for HttpOutpaintTransport {
    async fn send(&self, request: OutpaintRequest) -> Result<OutpaintResponse, OutpaintError> {
        let form = Form::new()
            .part("image", Self::png_part(request.image_png, "image.png")?)
            .part("mask", Self::png_part(request.mask_png, "mask.png")?)
            .text("prompt", request.prompt)
            .text("provider", request.provider.as_str())
            .text("strength", request.strength.to_string())
            .text("width", request.width.to_string())
            .text("height", request.height.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OutpaintError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| OutpaintError::Network(e.to_string()))?;

        Ok(OutpaintResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Color hint: stretched edges with the source contained on top
pub fn prepare_outpaint_input(source: &Drawable, width: u32, height: u32) -> Canvas {
    let mut canvas = Canvas::new(width, height);
    draw_stretched_edges(&mut canvas, source);
    draw_centered_image(&mut canvas, source, FitMode::Contain);
    canvas
}

/// White (paint) everywhere except the contained source minus the padding,
/// then blurred so the model blends across the seam.
pub fn prepare_outpaint_mask(source: &Drawable, width: u32, height: u32) -> Canvas {
    let mut canvas = Canvas::new(width, height);
    canvas.fill(MASK_PAINT);

    let rect = centered_rect(source.width(), source.height(), width, height, FitMode::Contain);
    let inner_w = (rect.width - MASK_PADDING * 2.0).max(0.0);
    let inner_h = (rect.height - MASK_PADDING * 2.0).max(0.0);
    let x = (rect.x + MASK_PADDING).round() as i64;
    let y = (rect.y + MASK_PADDING).round() as i64;
    canvas.fill_rect(x, y, inner_w.round() as u32, inner_h.round() as u32, MASK_KEEP);

    if canvas.is_empty() {
        return canvas;
    }
    Canvas::from_image(imageops::fast_blur(canvas.as_image(), MASK_BLUR))
}

/// Runs AI extensions with the stored strength preference
pub struct OutpaintService {
    transport: Arc<dyn OutpaintTransport>,
    preferences: Arc<PreferenceStore>,
    default_provider: OutpaintProvider,
}

impl OutpaintService {
    pub fn new(
        transport: Arc<dyn OutpaintTransport>,
        preferences: Arc<PreferenceStore>,
        default_provider: OutpaintProvider,
    ) -> Self {
        Self {
            transport,
            preferences,
            default_provider,
        }
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    /// Prepare the request for `source` extended to `width` x `height`
    pub async fn build_request(
        &self,
        source: &Drawable,
        width: u32,
        height: u32,
        options: &OutpaintOptions,
    ) -> Result<OutpaintRequest, OutpaintError> {
        if width == 0 || height == 0 {
            return Err(OutpaintError::InvalidSize(width, height));
        }

        let input = prepare_outpaint_input(source, width, height);
        let mask = prepare_outpaint_mask(source, width, height);

        Ok(OutpaintRequest {
            image_png: canvas_to_blob(&input, ExportFormat::Png, 100)?,
            mask_png: canvas_to_blob(&mask, ExportFormat::Png, 100)?,
            prompt: options.effective_prompt().to_string(),
            provider: options.provider.unwrap_or(self.default_provider),
            strength: clamp_strength(self.preferences.ai_strength().await),
            width,
            height,
        })
    }

    /// Generate an extension of `source` at the target size.
    ///
    /// Non-2xx replies and suspiciously small bodies are errors; nothing is
    /// retried.
    pub async fn generate_ai_expansion(
        &self,
        source: &Drawable,
        width: u32,
        height: u32,
        options: &OutpaintOptions,
    ) -> Result<GeneratedImage, OutpaintError> {
        let request = self.build_request(source, width, height, options).await?;
        let strength = request.strength;
        let provider = request.provider;

        tracing::info!(
            "Requesting AI extension {}x{} via {} (strength {:.2})",
            width,
            height,
            provider,
            strength
        );

        let response = self.transport.send(request).await?;

        if !response.status.is_success() {
            let message = remote::error_message(response.status, &response.body);
            tracing::warn!("AI extension failed ({}): {}", response.status, message);
            return Err(OutpaintError::Service {
                status: response.status.as_u16(),
                message,
            });
        }

        if response.body.len() < MIN_RESPONSE_BYTES {
            tracing::warn!("AI extension returned only {} bytes", response.body.len());
            return Err(OutpaintError::PayloadTooSmall(response.body.len()));
        }

        let decoded = image::load_from_memory(&response.body)?.to_rgba8();
        Ok(GeneratedImage::new(decoded, response.body.len(), strength))
    }
}
