//! Background Removal
//!
//! The abstract remover used by Stage 1 and an HTTP implementation that
//! forwards the image to a removal proxy.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::encoder::{encode_image, EncodeError};
use super::remote;
use crate::models::{ExportFormat, ImageFile};

/// Progress callback: `(phase key, current, total)`
pub type RemovalProgress<'a> = &'a (dyn Fn(&str, u64, u64) + Send + Sync);

/// Background removal error
#[derive(Debug, thiserror::Error)]
pub enum RemovalError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Removal service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("Failed to prepare image: {0}")]
    Encode(#[from] EncodeError),
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Turns an image into a cutout with a transparent background
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Resolve to the encoded cutout (any raster format `image` can decode)
    async fn remove_background(
        &self,
        image: &ImageFile,
        progress: RemovalProgress<'_>,
    ) -> Result<Vec<u8>, RemovalError>;
}

/// Remover backed by a remote removal endpoint
pub struct RemoteBackgroundRemover {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteBackgroundRemover {
    pub fn new(endpoint: impl Into<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            client: remote::build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BackgroundRemover for RemoteBackgroundRemover {
    async fn remove_background(
        &self,
        image: &ImageFile,
        progress: RemovalProgress<'_>,
    ) -> Result<Vec<u8>, RemovalError> {
        let png = encode_image(&image.drawable().rgba(), ExportFormat::Png, 100)?;
        let total = png.len() as u64;
        progress("fetch:upload", 0, total);

        let part = Part::bytes(png)
            .file_name("image.png")
            .mime_str(ExportFormat::Png.mime_type())
            .map_err(|e| RemovalError::Network(e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemovalError::Network(e.to_string()))?;
        progress("fetch:upload", total, total);

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemovalError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = remote::error_message(status, &body);
            tracing::warn!("Background removal failed ({}): {}", status, message);
            return Err(RemovalError::Service {
                status: status.as_u16(),
                message,
            });
        }

        progress("compute:mask", 1, 1);
        if body.is_empty() {
            return Err(RemovalError::Decode("empty body".to_string()));
        }

        Ok(body.to_vec())
    }
}
