//! Mood Classifier Port - 情绪分类抽象

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::MoodMetadata;

/// 情绪分类错误
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Mood Classifier Port
///
/// 每个段落调用一次；失败不会中止任务，由调用方替换为默认元数据
#[async_trait]
pub trait MoodClassifierPort: Send + Sync {
    /// 对段落文本进行情绪分类
    async fn classify(&self, text: &str) -> Result<MoodMetadata, ClassifierError>;

    /// 检查分类服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
