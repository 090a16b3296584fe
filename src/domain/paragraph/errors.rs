//! Paragraph Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("输入文本为空")]
    EmptyInput,

    #[error("无效的分割配置: {0}")]
    InvalidConfig(String),
}
