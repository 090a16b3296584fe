//! HTTP Mood Classifier - 调用外部情绪分类服务
//!
//! 外部分类 API:
//! POST {base_url}/api/mood/classify
//! Request: {"text": "..."}
//! Response: {"mood": "...", "genre": "...", "intensity": 1..10, "tempo": "slow|medium|fast"}
//!
//! 返回值宽松解析：intensity 可以是数字或数字字符串，超范围时截断到 [1, 10]，
//! 无法识别的 tempo 按 medium 处理。

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::application::ports::{ClassifierError, MoodClassifierPort};
use crate::domain::{MoodMetadata, Tempo};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    mood: Option<String>,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    intensity: Value,
    #[serde(default)]
    tempo: Option<String>,
}

impl ClassifyResponse {
    fn into_metadata(self) -> Result<MoodMetadata, ClassifierError> {
        let mood = self
            .mood
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ClassifierError::InvalidResponse("missing mood".to_string()))?;
        let fallback = MoodMetadata::fallback();
        let intensity = match &self.intensity {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .unwrap_or(fallback.intensity.value() as i64);
        let tempo = self
            .tempo
            .as_deref()
            .map(Tempo::parse_lenient)
            .unwrap_or(fallback.tempo);
        let genre = self
            .genre
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(fallback.genre);

        Ok(MoodMetadata::new(mood, genre, intensity, tempo))
    }
}

/// HTTP 分类客户端配置
#[derive(Debug, Clone)]
pub struct HttpMoodClassifierConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpMoodClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP 情绪分类客户端
pub struct HttpMoodClassifier {
    client: Client,
    config: HttpMoodClassifierConfig,
}

impl HttpMoodClassifier {
    pub fn new(config: HttpMoodClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn classify_url(&self) -> String {
        format!(
            "{}/api/mood/classify",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl MoodClassifierPort for HttpMoodClassifier {
    async fn classify(&self, text: &str) -> Result<MoodMetadata, ClassifierError> {
        let response = self
            .client
            .post(self.classify_url())
            .json(&ClassifyRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout
                } else {
                    ClassifierError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        let metadata = body.into_metadata()?;

        tracing::debug!(
            mood = %metadata.mood,
            intensity = metadata.intensity.value(),
            tempo = %metadata.tempo,
            "Paragraph classified"
        );
        Ok(metadata)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        matches!(
            self.client.get(url).timeout(Duration::from_secs(5)).send().await,
            Ok(r) if r.status().is_success()
        )
    }
}
