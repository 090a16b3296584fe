//! Audio Codec Port - 音频编解码抽象
//!
//! 解码：任意受支持容器 → PCM；编码：PCM → WAV / Opus (OGG 容器)。
//! 编解码是 CPU 密集型同步操作，调用方负责放到阻塞线程池执行。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PcmBuffer;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// 成品输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// 16 位 PCM WAV
    #[default]
    Wav,
    /// Opus 格式 (OGG 容器)，仅接受 Opus 原生采样率
    Opus,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Opus => "opus",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Opus => "audio/ogg",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "opus" => Ok(AudioFormat::Opus),
            _ => Err(CodecError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// 编码配置
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// 输出格式
    pub format: AudioFormat,
    /// 目标比特率（bps），仅用于有损格式
    pub bitrate: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::Wav,
            bitrate: 64000,
        }
    }
}

/// Audio Codec Port
pub trait AudioCodecPort: Send + Sync {
    /// 解码音频
    ///
    /// # Arguments
    /// * `data` - 完整的音频文件字节
    /// * `extension_hint` - 可选的扩展名提示（如 "wav"、"mp3"）
    fn decode(&self, data: &[u8], extension_hint: Option<&str>) -> Result<PcmBuffer, CodecError>;

    /// 编码音频，保持缓冲声明的采样率与声道数
    fn encode(&self, pcm: &PcmBuffer, config: &EncodeConfig) -> Result<Vec<u8>, CodecError>;

    /// 检查是否支持指定输出格式
    fn supports_format(&self, format: AudioFormat) -> bool;
}
