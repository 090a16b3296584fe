//! Artifact Storage Port - 出站端口
//!
//! 成品音频的存储/上传抽象：交出字节与逻辑路径，换回可访问的 URL。
//! 重试与持久性由存储方负责，流水线不重试。

use async_trait::async_trait;
use thiserror::Error;

/// 上传错误
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid logical path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Storage full: used {used} bytes, limit {limit} bytes")]
    StorageFull { used: u64, limit: u64 },
}

/// 已存储的成品
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    /// 逻辑路径
    pub path: String,
    /// 可访问 URL
    pub url: String,
    /// 大小（字节）
    pub size_bytes: u64,
}

/// Artifact Storage Port - 出站端口
#[async_trait]
pub trait ArtifactStoragePort: Send + Sync {
    /// 存储字节并返回可访问的引用
    async fn store(&self, logical_path: &str, data: Vec<u8>) -> Result<StoredArtifact, UploadError>;

    /// 删除成品
    async fn delete(&self, logical_path: &str) -> Result<(), UploadError>;
}
