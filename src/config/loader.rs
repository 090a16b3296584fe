//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "NARRAMIX";

/// 加载应用配置
///
/// # 环境变量示例
/// - `NARRAMIX_SERVER__PORT=8080`
/// - `NARRAMIX_TTS__URL=http://tts-server:8000`
/// - `NARRAMIX_PIPELINE__GAP_SECS=2.5`
/// - `NARRAMIX_PIPELINE__MIX_MODE=timeline`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// 结构体字段都带 serde 默认值，这里只负责合并来源
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: NARRAMIX_TTS__URL=http://tts-server:8000
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

fn check_gain(name: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{} must be within [0, 1], got {}", name, value)));
    }
    Ok(())
}

fn check_duration(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{} cannot be negative, got {}", name, value)));
    }
    Ok(())
}

/// 验证配置有效性
pub(crate) fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if config.tts.url.trim().is_empty() && config.tts.fake_audio_path.is_none() {
        return Err(invalid("TTS URL cannot be empty"));
    }
    if config.classifier.url.trim().is_empty() {
        return Err(invalid("Classifier URL cannot be empty"));
    }
    if config.tts.max_attempts == 0 || config.classifier.max_attempts == 0 {
        return Err(invalid("max_attempts must be at least 1"));
    }
    if config.tts.timeout_secs == 0 || config.classifier.timeout_secs == 0 {
        return Err(invalid("timeout_secs cannot be 0"));
    }

    if config.assets.last_resort.trim().is_empty() {
        return Err(invalid("assets.last_resort cannot be empty"));
    }

    let p = &config.pipeline;
    if p.delimiter.chars().count() != 1 {
        return Err(invalid(format!(
            "pipeline.delimiter must be a single character, got {:?}",
            p.delimiter
        )));
    }
    if p.max_units == 0 {
        return Err(invalid("pipeline.max_units cannot be 0"));
    }
    if p.max_concurrent_paragraphs == 0 {
        return Err(invalid("pipeline.max_concurrent_paragraphs cannot be 0"));
    }
    check_gain("pipeline.narration_gain", p.narration_gain)?;
    check_gain("pipeline.background_gain", p.background_gain)?;
    check_gain("pipeline.background_floor", p.background_floor)?;
    check_duration("pipeline.gap_secs", p.gap_secs)?;
    check_duration("pipeline.fade_in_secs", p.fade_in_secs)?;
    check_duration("pipeline.fade_out_secs", p.fade_out_secs)?;
    check_duration("pipeline.crossfade_secs", p.crossfade_secs)?;

    if config.worker.max_concurrent_jobs == 0 || config.worker.queue_capacity == 0 {
        return Err(invalid("worker concurrency and queue capacity must be positive"));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    match &config.tts.fake_audio_path {
        Some(path) => tracing::info!("TTS: fake audio {:?}", path),
        None => tracing::info!("TTS URL: {} (timeout {}s)", config.tts.url, config.tts.timeout_secs),
    }
    tracing::info!("Classifier URL: {}", config.classifier.url);
    tracing::info!("Assets Directory: {:?}", config.assets.dir);
    tracing::info!("Artifacts Directory: {:?}", config.storage.artifacts_dir);
    tracing::info!("Narration Cache: {}", config.cache.enabled);
    tracing::info!(
        "Pipeline: gap={}s mode={:?} format={} concurrency={}",
        config.pipeline.gap_secs,
        config.pipeline.mix_mode,
        config.pipeline.output_format,
        config.pipeline.max_concurrent_paragraphs
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::MixMode;
    use crate::application::ports::AudioFormat;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let cases: Vec<Box<dyn Fn(&mut AppConfig)>> = vec![
            Box::new(|c| c.server.port = 0),
            Box::new(|c| c.tts.url = String::new()),
            Box::new(|c| c.classifier.max_attempts = 0),
            Box::new(|c| c.pipeline.delimiter = String::new()),
            Box::new(|c| c.pipeline.delimiter = "$$".to_string()),
            Box::new(|c| c.pipeline.max_units = 0),
            Box::new(|c| c.pipeline.background_gain = 1.5),
            Box::new(|c| c.pipeline.background_floor = -0.1),
            Box::new(|c| c.pipeline.gap_secs = -1.0),
            Box::new(|c| c.worker.queue_capacity = 0),
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut config = AppConfig::default();
            mutate(&mut config);
            assert!(
                matches!(validate_config(&config), Err(ConfigError::ValidationError(_))),
                "case {} should fail",
                i
            );
        }
    }

    #[test]
    fn test_floor_above_gain_is_accepted() {
        let mut config = AppConfig::default();
        config.pipeline.background_gain = 0.02;
        config.pipeline.background_floor = 0.1;
        assert!(validate_config(&config).is_ok());

        let settings = config.pipeline.mix_settings();
        assert!((settings.effective_background_gain() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_fake_tts_allows_empty_url() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        config.tts.fake_audio_path = Some("voice.wav".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 7070

[pipeline]
gap_secs = 1.25
mix_mode = "timeline"
output_format = "opus"
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.pipeline.gap_secs, 1.25);
        assert_eq!(config.pipeline.mix_mode, MixMode::Timeline);
        assert_eq!(config.pipeline.output_format, AudioFormat::Opus);
        // 未出现的字段保持默认值
        assert_eq!(config.pipeline.delimiter, "$");
        assert_eq!(config.tts.max_attempts, 3);
    }
}
