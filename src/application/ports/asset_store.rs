//! Asset Store Port - 背景音乐素材库抽象
//!
//! 素材库布局：`{Category}/{文件名}`，文件名带 1..=7 的强度索引

use async_trait::async_trait;
use thiserror::Error;

/// 素材库错误
#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Asset Store Port
///
/// 流水线对素材库只做只读访问
#[async_trait]
pub trait AssetStorePort: Send + Sync {
    /// 列出分类下的所有素材文件名
    async fn list_assets_in_category(&self, category: &str) -> Result<Vec<String>, AssetStoreError>;

    /// 检查素材是否存在
    async fn exists(&self, path: &str) -> bool;

    /// 获取素材的可访问 URL
    fn resolve_url(&self, path: &str) -> String;

    /// 读取素材内容
    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetStoreError>;
}
