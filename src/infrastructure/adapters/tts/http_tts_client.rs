//! HTTP TTS Client - 调用外部旁白合成服务
//!
//! 实现 TtsEnginePort trait，通过 HTTP 调用外部 TTS 服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/infer
//! Request: {"text": "...", "voice_ref": "http://...", "speed": 1.0}  (JSON)
//! Response: audio/wav binary, metadata in headers

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};

/// TTS 推理请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    /// 要合成的文本
    text: &'a str,
    /// 参考音频的 URL 或路径（TTS 服务自行下载/读取并缓存）
    voice_ref: &'a str,
    /// 语速提示
    speed: f32,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 单次请求超时时间（秒），重试由流水线负责
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn infer_url(&self) -> String {
        format!("{}/api/tts/infer", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError> {
        let http_request = TtsHttpRequest {
            text: &request.text,
            voice_ref: &request.voice_ref,
            speed: request.speed,
        };

        tracing::debug!(
            url = %self.infer_url(),
            paragraph = request.paragraph_index,
            text_len = request.text.len(),
            speed = request.speed,
            "Sending TTS synthesis request"
        );

        let response = self
            .client
            .post(self.infer_url())
            .json(&http_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let duration_ms = header_value(response.headers(), "X-TTS-Duration-Ms");
        let sample_rate = header_value(response.headers(), "X-TTS-Sample-Rate");

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio_data.is_empty() {
            return Err(TtsError::InvalidResponse("empty audio body".to_string()));
        }

        tracing::debug!(
            paragraph = request.paragraph_index,
            duration_ms = ?duration_ms,
            sample_rate = ?sample_rate,
            audio_size = audio_data.len(),
            "TTS synthesis completed"
        );

        Ok(SynthesisResponse {
            audio_data,
            duration_ms,
            sample_rate,
        })
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_config_default() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000/").with_timeout(60);
        let client = HttpTtsClient::new(config).unwrap();
        assert_eq!(client.infer_url(), "http://example.com:9000/api/tts/infer");
        assert_eq!(client.config.timeout_secs, 60);
    }

    #[test]
    fn test_request_body_carries_speed() {
        let body = TtsHttpRequest {
            text: "hello",
            voice_ref: "narrator.wav",
            speed: 1.1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["voice_ref"], "narrator.wav");
        assert!((json["speed"].as_f64().unwrap() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_header_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("X-TTS-Sample-Rate", HeaderValue::from_static("24000"));
        headers.insert("X-TTS-Duration-Ms", HeaderValue::from_static("oops"));
        assert_eq!(header_value::<u32>(&headers, "X-TTS-Sample-Rate"), Some(24000));
        assert_eq!(header_value::<u64>(&headers, "X-TTS-Duration-Ms"), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client =
            HttpTtsClient::new(HttpTtsClientConfig::new("http://127.0.0.1:9").with_timeout(2))
                .unwrap();
        let err = client
            .synthesize(SynthesisRequest {
                text: "hi".to_string(),
                voice_ref: "v".to_string(),
                speed: 1.0,
                paragraph_index: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::NetworkError(_) | TtsError::Timeout));
        assert!(!client.health_check().await);
    }
}
