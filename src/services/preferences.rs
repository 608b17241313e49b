//! Preference Store
//!
//! User preferences that survive between sessions. Today that is the AI
//! outpaint strength.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;

/// Strength used when nothing has been stored yet
pub const DEFAULT_AI_STRENGTH: f32 = 0.88;
pub const MIN_AI_STRENGTH: f32 = 0.1;
pub const MAX_AI_STRENGTH: f32 = 1.0;

/// Preference error
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_ai_strength() -> f32 {
    DEFAULT_AI_STRENGTH
}

/// Clamp a strength into the range the outpaint service accepts
pub fn clamp_strength(strength: f32) -> f32 {
    if strength.is_nan() {
        DEFAULT_AI_STRENGTH
    } else {
        strength.clamp(MIN_AI_STRENGTH, MAX_AI_STRENGTH)
    }
}

/// Persisted preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_ai_strength")]
    pub ai_strength: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ai_strength: DEFAULT_AI_STRENGTH,
        }
    }
}

/// Preferences backed by a JSON file, or by memory only
pub struct PreferenceStore {
    path: Option<PathBuf>,
    current: RwLock<Preferences>,
}

impl PreferenceStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(Preferences::default()),
        }
    }

    /// Open the store at `path`. A missing or unreadable file yields defaults.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();

        let prefs = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed preferences at {}: {}", path.display(), e);
                Preferences::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            current: RwLock::new(prefs),
        })
    }

    pub async fn get(&self) -> Preferences {
        self.current.read().await.clone()
    }

    /// Strength to use for the next generation
    pub async fn ai_strength(&self) -> f32 {
        clamp_strength(self.current.read().await.ai_strength)
    }

    pub async fn set_ai_strength(&self, strength: f32) -> Result<(), PreferenceError> {
        let snapshot = {
            let mut current = self.current.write().await;
            current.ai_strength = clamp_strength(strength);
            current.clone()
        };
        self.persist(&snapshot).await
    }

    /// Remember the strength of a generation the user liked.
    /// Returns whether anything was stored.
    pub async fn record_ai_feedback(
        &self,
        good: bool,
        used_strength: f32,
    ) -> Result<bool, PreferenceError> {
        if !good {
            return Ok(false);
        }
        self.set_ai_strength(used_strength).await?;
        tracing::info!("Stored AI strength {:.2}", clamp_strength(used_strength));
        Ok(true)
    }

    async fn persist(&self, prefs: &Preferences) -> Result<(), PreferenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(prefs)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
