//! Audio Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MixError {
    #[error("音频格式不一致: 期望 {expected}, 实际 {actual}")]
    FormatMismatch { expected: String, actual: String },

    #[error("背景音乐为空")]
    EmptyBackground,

    #[error("无效的 PCM 缓冲: {0}")]
    InvalidBuffer(String),

    #[error("无效的背景区域: {0}")]
    InvalidRegion(String),

    #[error("重采样失败: {0}")]
    Resample(String),

    #[error("没有可拼接的段落")]
    EmptySequence,
}
