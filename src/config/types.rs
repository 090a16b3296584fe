//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::AudioFormat;
use crate::application::services::{MixMode, MusicResolverConfig, PipelineConfig, RetryPolicy};
use crate::domain::{MixSettings, SegmentConfig};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 旁白合成服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 情绪分类服务配置
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// 背景音乐素材库配置
    #[serde(default)]
    pub assets: AssetsConfig,

    /// 成品存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 旁白缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 流水线参数
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Worker 配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL（成品与素材 URL 的前缀）
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 旁白合成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 默认参考音色
    #[serde(default = "default_voice_ref")]
    pub voice_ref: String,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 最大尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 设置后使用固定音频文件代替 TTS 服务（离线调试）
    #[serde(default)]
    pub fake_audio_path: Option<PathBuf>,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_voice_ref() -> String {
    "default".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            voice_ref: default_voice_ref(),
            timeout_secs: default_tts_timeout(),
            max_attempts: default_max_attempts(),
            fake_audio_path: None,
        }
    }
}

/// 情绪分类服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_url")]
    pub url: String,

    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_classifier_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_classifier_timeout() -> u64 {
    30
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url: default_classifier_url(),
            timeout_secs: default_classifier_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// 背景音乐素材库配置
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// 素材根目录，下设各分类目录
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,

    /// 素材扩展名
    #[serde(default = "default_asset_extension")]
    pub extension: String,

    /// 内置兜底素材（相对素材根目录）
    #[serde(default = "default_last_resort")]
    pub last_resort: String,

    /// 素材公开 URL 前缀，未设置时使用服务器 Base URL
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets/music")
}

fn default_asset_extension() -> String {
    "mp3".to_string()
}

fn default_last_resort() -> String {
    "fallback.mp3".to_string()
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            extension: default_asset_extension(),
            last_resort: default_last_resort(),
            public_url: None,
        }
    }
}

impl AssetsConfig {
    pub fn resolver_config(&self) -> MusicResolverConfig {
        MusicResolverConfig {
            extension: self.extension.trim_start_matches('.').to_string(),
            last_resort_path: self.last_resort.clone(),
        }
    }
}

/// 成品存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 成品目录
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

/// 旁白缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sled 数据库路径
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// 最大缓存大小（字节）
    #[serde(default = "default_cache_size")]
    pub max_size_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/narration.sled")
}

fn default_cache_size() -> u64 {
    2 * 1024 * 1024 * 1024 // 2 GB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
            max_size_bytes: default_cache_size(),
        }
    }
}

/// 流水线参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 段落分隔符（单个字符）
    pub delimiter: String,
    pub fallback_min_chars: usize,
    pub max_units: usize,
    /// 段落间静音（秒）
    pub gap_secs: f64,
    pub narration_gain: f32,
    pub background_gain: f32,
    pub background_floor: f32,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    pub crossfade_secs: f64,
    pub mix_mode: MixMode,
    pub output_format: AudioFormat,
    /// Opus 比特率（bps）
    pub opus_bitrate: u32,
    /// drama 分类的随机种子，设置后结果可复现
    pub drama_seed: Option<u64>,
    pub max_concurrent_paragraphs: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let segment = SegmentConfig::default();
        let mix = MixSettings::default();
        let pipeline = PipelineConfig::default();
        Self {
            delimiter: segment.delimiter.to_string(),
            fallback_min_chars: segment.fallback_min_chars,
            max_units: segment.max_units,
            gap_secs: pipeline.gap_secs,
            narration_gain: mix.narration_gain,
            background_gain: mix.background_gain,
            background_floor: mix.background_floor,
            fade_in_secs: mix.fade_in_secs,
            fade_out_secs: mix.fade_out_secs,
            crossfade_secs: mix.crossfade_secs,
            mix_mode: pipeline.mix_mode,
            output_format: AudioFormat::Wav,
            opus_bitrate: pipeline.opus_bitrate,
            drama_seed: None,
            max_concurrent_paragraphs: pipeline.max_concurrent_paragraphs,
        }
    }
}

impl PipelineSection {
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            delimiter: self
                .delimiter
                .chars()
                .next()
                .unwrap_or(SegmentConfig::default().delimiter),
            fallback_min_chars: self.fallback_min_chars,
            max_units: self.max_units,
        }
    }

    pub fn mix_settings(&self) -> MixSettings {
        MixSettings {
            narration_gain: self.narration_gain,
            background_gain: self.background_gain,
            background_floor: self.background_floor,
            fade_in_secs: self.fade_in_secs,
            fade_out_secs: self.fade_out_secs,
            crossfade_secs: self.crossfade_secs,
        }
    }

    /// 组装流水线配置，外部调用的超时与重试来自各服务配置
    pub fn pipeline_config(&self, tts: &TtsConfig, classifier: &ClassifierConfig) -> PipelineConfig {
        PipelineConfig {
            segment: self.segment_config(),
            mix: self.mix_settings(),
            gap_secs: self.gap_secs,
            mix_mode: self.mix_mode,
            opus_bitrate: self.opus_bitrate,
            max_concurrent_paragraphs: self.max_concurrent_paragraphs,
            tts_retry: RetryPolicy::new(tts.max_attempts, Duration::from_secs(tts.timeout_secs)),
            classifier_retry: RetryPolicy::new(
                classifier.max_attempts,
                Duration::from_secs(classifier.timeout_secs),
            ),
        }
    }
}

/// Worker 配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 最大并发任务数
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// 任务队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 已结束任务在内存中保留的时长（秒）
    #[serde(default = "default_job_retention")]
    pub job_retention_secs: u64,
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_job_retention() -> u64 {
    86400 // 24 小时
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
            job_retention_secs: default_job_retention(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
