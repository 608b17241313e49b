//! Asset Studio Settings

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::services::OutpaintProvider;

/// Studio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    // Remote services
    /// Outpaint proxy endpoint
    pub outpaint_endpoint: String,
    /// Background removal endpoint (empty disables removal)
    pub remove_bg_endpoint: String,
    /// Provider used when a request does not name one
    pub default_ai_provider: OutpaintProvider,
    /// Transport timeout in seconds; none by default
    pub request_timeout_secs: Option<u64>,

    // Persistence
    /// Where user preferences are stored (empty keeps them in memory)
    pub preferences_path: String,

    // Rendering
    /// Quiet period before a preview re-render
    pub debounce_ms: u64,
    /// Cached source bitmaps unused for this long are evicted
    pub cache_ttl_secs: u64,
    /// Longest side of tool previews
    pub preview_max_dimension: u32,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            outpaint_endpoint: "http://localhost:3000/api/outpaint".to_string(),
            remove_bg_endpoint: String::new(),
            default_ai_provider: OutpaintProvider::Cloudflare,
            request_timeout_secs: None,

            preferences_path: String::new(),

            debounce_ms: 150,
            cache_ttl_secs: 30 * 60,
            preview_max_dimension: 800,
        }
    }
}

impl StudioConfig {
    /// Load settings from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save settings to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn remove_bg_enabled(&self) -> bool {
        !self.remove_bg_endpoint.trim().is_empty()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = validate_endpoint(&self.outpaint_endpoint) {
            errors.push(format!("Outpaint endpoint: {}", e));
        }

        if self.remove_bg_enabled() {
            if let Err(e) = validate_endpoint(&self.remove_bg_endpoint) {
                errors.push(format!("Background removal endpoint: {}", e));
            }
        }

        if self.request_timeout_secs == Some(0) {
            errors.push("Request timeout must be greater than 0".to_string());
        }

        if self.cache_ttl_secs == 0 {
            errors.push("Cache TTL must be greater than 0".to_string());
        }

        if self.preview_max_dimension == 0 {
            errors.push("Preview max dimension must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), String> {
    let parsed = url::Url::parse(endpoint).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        assert!(StudioConfig::default().validate().is_ok());
        assert!(!StudioConfig::default().remove_bg_enabled());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = StudioConfig {
            outpaint_endpoint: "not a url".to_string(),
            remove_bg_endpoint: "ftp://example.com/remove".to_string(),
            request_timeout_secs: Some(0),
            cache_ttl_secs: 0,
            ..StudioConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[1].contains("unsupported scheme ftp"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio.json");

        let config = StudioConfig {
            default_ai_provider: OutpaintProvider::Fal,
            debounce_ms: 40,
            ..StudioConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = StudioConfig::load(&path).unwrap();
        assert_eq!(loaded.default_ai_provider, OutpaintProvider::Fal);
        assert_eq!(loaded.debounce_ms, 40);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{"preview_max_dimension": 400}"#).unwrap();

        let loaded = StudioConfig::load(&path).unwrap();
        assert_eq!(loaded.preview_max_dimension, 400);
        assert_eq!(loaded.cache_ttl_secs, 1800);
    }
}
