//! TTS Engine Port - 旁白合成引擎抽象
//!
//! 定义旁白合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 旁白合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的段落文本
    pub text: String,
    /// 参考音色（URL 或路径，由 TTS 服务自行下载/读取并缓存）
    pub voice_ref: String,
    /// 语速提示，1.0 为正常语速
    pub speed: f32,
    /// 段落索引（用于日志和追踪）
    pub paragraph_index: usize,
}

/// 旁白合成响应
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    /// 可解码的完整音频数据（WAV 等）
    pub audio_data: Vec<u8>,
    /// 音频时长（毫秒）
    pub duration_ms: Option<u64>,
    /// 采样率
    pub sample_rate: Option<u32>,
}

/// TTS Engine Port
///
/// 外部旁白合成服务的抽象接口，整段返回，不需要流式
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成一个段落的旁白
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
