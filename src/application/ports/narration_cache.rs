//! Narration Cache Port - 旁白音频缓存
//!
//! 定义旁白缓存的抽象接口，具体实现使用 Sled (LRU 缓存)

use async_trait::async_trait;
use thiserror::Error;

/// Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("Cache full, eviction failed")]
    EvictionFailed,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 缓存元数据
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    pub voice_ref: String,
    pub duration_ms: u64,
    pub sample_rate: Option<u32>,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Narration Cache Port
///
/// 基于 md5(段落文本) + voice_ref + 语速的 LRU 缓存，命中时跳过合成
#[async_trait]
pub trait NarrationCachePort: Send + Sync {
    /// 存储旁白音频
    ///
    /// 自动执行 LRU 淘汰以保持缓存大小在限制内
    async fn put(
        &self,
        cache_key: &str,
        audio_data: Vec<u8>,
        metadata: CacheMetadata,
    ) -> Result<(), CacheError>;

    /// 根据缓存 key 获取旁白音频，同时更新 last_accessed（LRU touch）
    async fn get(&self, cache_key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// 删除缓存条目
    async fn remove(&self, cache_key: &str) -> Result<(), CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 生成缓存 key
///
/// 使用 md5(段落文本) + voice_ref + 语速作为缓存 key
pub fn generate_cache_key(text: &str, voice_ref: &str, speed: f32) -> String {
    let digest = md5::compute(text.as_bytes());
    format!("{:x}:{}:{:.2}", digest, voice_ref, speed)
}
