//! Fake TTS Client - 离线调试用的 TTS 客户端
//!
//! 始终返回固定的音频文件，不实际调用 TTS 服务

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 固定返回的音频文件路径
    pub audio_file_path: PathBuf,
    /// 模拟合成延迟
    pub latency: Duration,
}

impl FakeTtsClientConfig {
    pub fn new(audio_file_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_file_path: audio_file_path.into(),
            latency: Duration::from_millis(200),
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    /// 缓存的音频数据
    audio_data: Vec<u8>,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Result<Self, std::io::Error> {
        let audio_data = std::fs::read(&config.audio_file_path)?;
        tracing::info!(
            path = %config.audio_file_path.display(),
            size = audio_data.len(),
            "FakeTtsClient initialized"
        );
        Ok(Self { config, audio_data })
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError> {
        tracing::debug!(
            paragraph = request.paragraph_index,
            text_len = request.text.len(),
            "FakeTtsClient: returning fixed audio"
        );

        tokio::time::sleep(self.config.latency).await;

        Ok(SynthesisResponse {
            audio_data: self.audio_data.clone(),
            duration_ms: None,
            sample_rate: None,
        })
    }
}
