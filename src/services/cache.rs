//! Bitmap Cache
//!
//! Decoded source bitmaps keyed by source identity, with TTL eviction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use image::RgbaImage;
use tokio::sync::RwLock;

struct CacheEntry {
    bitmap: Arc<RgbaImage>,
    last_used: DateTime<Utc>,
}

/// Injected store for Stage 1 bitmaps.
///
/// Entries are read-only once inserted; inserting an existing key is a no-op.
pub struct BitmapCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl BitmapCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// TTL in seconds; values past what `Duration` holds never expire
    pub fn with_ttl_secs(secs: u64) -> Self {
        let ttl = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(ttl)
    }

    /// Cached bitmap, refreshing its last-used time
    pub async fn get(&self, key: &str) -> Option<Arc<RgbaImage>> {
        let mut entries = self.entries.write().await;
        entries.get_mut(key).map(|entry| {
            entry.last_used = Utc::now();
            Arc::clone(&entry.bitmap)
        })
    }

    /// Return the cached bitmap, building it with `decode` on first use
    pub async fn get_or_insert_with<F>(&self, key: &str, decode: F) -> Arc<RgbaImage>
    where
        F: FnOnce() -> RgbaImage,
    {
        if let Some(bitmap) = self.get(key).await {
            return bitmap;
        }

        let decoded = Arc::new(decode());
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_string()).or_insert_with(|| CacheEntry {
            bitmap: decoded,
            last_used: Utc::now(),
        });
        Arc::clone(&entry.bitmap)
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop entries unused for longer than the TTL
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.last_used <= self.ttl);
        let removed = before - entries.len();

        if removed > 0 {
            tracing::debug!("Evicted {} cached bitmaps", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for BitmapCache {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}
