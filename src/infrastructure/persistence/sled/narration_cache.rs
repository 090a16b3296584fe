//! Sled-based LRU Narration Cache Implementation

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{CacheError, CacheMetadata, CacheStats, NarrationCachePort};

const ENTRY_PREFIX: &str = "narration:";

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: PathBuf,
    /// 最大缓存大小（字节）
    pub max_size_bytes: u64,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/narration.sled"),
            max_size_bytes: 2 * 1024 * 1024 * 1024, // 2GB
        }
    }
}

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    audio_data: Vec<u8>,
    size_bytes: u64,
    voice_ref: String,
    duration_ms: u64,
    sample_rate: Option<u32>,
    last_accessed: i64,
    created_at: i64,
}

/// Sled 旁白缓存
pub struct SledNarrationCache {
    db: Db,
    max_size_bytes: u64,
    current_size: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

fn db_err(e: sled::Error) -> CacheError {
    CacheError::DatabaseError(e.to_string())
}

fn entry_key(cache_key: &str) -> String {
    format!("{}{}", ENTRY_PREFIX, cache_key)
}

impl SledNarrationCache {
    pub fn new(config: &SledCacheConfig) -> Result<Self, CacheError> {
        let db = sled::open(&config.db_path).map_err(db_err)?;

        let current_size = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path.display(),
            max_size_bytes = config.max_size_bytes,
            current_size,
            "SledNarrationCache initialized"
        );

        Ok(Self {
            db,
            max_size_bytes: config.max_size_bytes,
            current_size: AtomicU64::new(current_size),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn calculate_total_size(db: &Db) -> Result<u64, CacheError> {
        let mut total = 0u64;
        for item in db.scan_prefix(ENTRY_PREFIX) {
            let (_, value) = item.map_err(db_err)?;
            if let Ok(entry) = bincode::deserialize::<InternalCacheEntry>(&value) {
                total += entry.size_bytes;
            }
        }
        Ok(total)
    }

    /// LRU 淘汰一个条目，返回是否淘汰成功
    fn evict_lru(&self) -> Result<bool, CacheError> {
        let mut oldest: Option<(sled::IVec, InternalCacheEntry)> = None;

        for item in self.db.scan_prefix(ENTRY_PREFIX) {
            let (key, value) = item.map_err(db_err)?;
            if let Ok(entry) = bincode::deserialize::<InternalCacheEntry>(&value) {
                let is_older = oldest
                    .as_ref()
                    .map(|(_, e)| entry.last_accessed < e.last_accessed)
                    .unwrap_or(true);
                if is_older {
                    oldest = Some((key, entry));
                }
            }
        }

        let Some((key, entry)) = oldest else {
            return Ok(false);
        };

        self.db.remove(&key).map_err(db_err)?;
        self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);
        tracing::debug!(
            key = %String::from_utf8_lossy(&key),
            size_bytes = entry.size_bytes,
            "LRU evicted narration"
        );
        Ok(true)
    }

    pub fn flush(&self) -> Result<(), CacheError> {
        self.db.flush().map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl NarrationCachePort for SledNarrationCache {
    async fn put(
        &self,
        cache_key: &str,
        audio_data: Vec<u8>,
        metadata: CacheMetadata,
    ) -> Result<(), CacheError> {
        let size = audio_data.len() as u64;
        if size > self.max_size_bytes {
            return Err(CacheError::EvictionFailed);
        }

        // 覆盖写时先扣掉旧条目
        self.remove(cache_key).await?;

        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_lru()? {
                return Err(CacheError::EvictionFailed);
            }
        }

        let now = Utc::now().timestamp_millis();
        let entry = InternalCacheEntry {
            audio_data,
            size_bytes: size,
            voice_ref: metadata.voice_ref,
            duration_ms: metadata.duration_ms,
            sample_rate: metadata.sample_rate,
            last_accessed: now,
            created_at: now,
        };

        let entry_bytes =
            bincode::serialize(&entry).map_err(|e| CacheError::SerializationError(e.to_string()))?;
        self.db
            .insert(entry_key(cache_key), entry_bytes)
            .map_err(db_err)?;
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(cache_key = %cache_key, size_bytes = size, "Narration cached");
        Ok(())
    }

    async fn get(&self, cache_key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let key = entry_key(cache_key);

        match self.db.get(&key).map_err(db_err)? {
            Some(data) => {
                let mut entry: InternalCacheEntry = bincode::deserialize(&data)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;

                // LRU touch
                entry.last_accessed = Utc::now().timestamp_millis();
                let entry_bytes = bincode::serialize(&entry)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;
                self.db.insert(&key, entry_bytes).map_err(db_err)?;

                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.audio_data))
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError> {
        if let Some(data) = self.db.remove(entry_key(cache_key)).map_err(db_err)? {
            if let Ok(entry) = bincode::deserialize::<InternalCacheEntry>(&data) {
                self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.db.scan_prefix(ENTRY_PREFIX).count(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn metadata() -> CacheMetadata {
        CacheMetadata {
            voice_ref: "narrator".to_string(),
            duration_ms: 1000,
            sample_rate: Some(24000),
        }
    }

    fn open(dir: &tempfile::TempDir, max_size_bytes: u64) -> SledNarrationCache {
        SledNarrationCache::new(&SledCacheConfig {
            db_path: dir.path().join("test.sled"),
            max_size_bytes,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 1024 * 1024);

        let audio_data = vec![1, 2, 3, 4, 5];
        cache.put("key", audio_data.clone(), metadata()).await.unwrap();

        assert_eq!(cache.get("key").await.unwrap(), Some(audio_data));
        assert_eq!(cache.get("missing").await.unwrap(), None);

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 5);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_double_count() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 1024);
        cache.put("key", vec![0; 10], metadata()).await.unwrap();
        cache.put("key", vec![0; 20], metadata()).await.unwrap();
        assert_eq!(cache.stats().await.total_size_bytes, 20);

        cache.remove("key").await.unwrap();
        assert_eq!(cache.stats().await.total_size_bytes, 0);
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 25);

        cache.put("a", vec![0; 10], metadata()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.put("b", vec![0; 10], metadata()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        // 访问 a，使 b 成为最久未使用
        cache.get("a").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        cache.put("c", vec![0; 10], metadata()).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
        assert_eq!(cache.stats().await.total_size_bytes, 20);
    }

    #[tokio::test]
    async fn test_oversized_entry_rejected() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 4);
        let err = cache.put("big", vec![0; 5], metadata()).await.unwrap_err();
        assert!(matches!(err, CacheError::EvictionFailed));
    }

    #[tokio::test]
    async fn test_size_restored_on_reopen() {
        let dir = tempdir().unwrap();
        {
            let cache = open(&dir, 1024);
            cache.put("key", vec![0; 42], metadata()).await.unwrap();
            cache.flush().unwrap();
        }
        let cache = open(&dir, 1024);
        assert_eq!(cache.stats().await.total_size_bytes, 42);
        assert_eq!(cache.get("key").await.unwrap().map(|d| d.len()), Some(42));
    }
}
