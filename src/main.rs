//! narramix - 有声旁白渲染服务
//!
//! 启动顺序：配置 -> 日志 -> 适配器 -> 流水线 -> Worker -> HTTP

use std::sync::Arc;
use std::time::Duration;

use narramix::application::{
    JobManagerPort, MoodClassifierPort, MusicResolver, NarrationCachePort, NarrationPipeline,
    RenderDefaults, TtsEnginePort,
};
use narramix::config::{load_config, print_config, AppConfig};
use narramix::domain::StdRandomSource;
use narramix::infrastructure::adapters::{
    FakeTtsClient, FakeTtsClientConfig, FileArtifactStorage, FileAssetStore, HttpMoodClassifier,
    HttpMoodClassifierConfig, HttpTtsClient, HttpTtsClientConfig, SymphoniaCodec,
};
use narramix::infrastructure::events::EventPublisher;
use narramix::infrastructure::http::{AppState, HttpServer, ServerConfig};
use narramix::infrastructure::memory::InMemoryJobManager;
use narramix::infrastructure::persistence::sled::{SledCacheConfig, SledNarrationCache};
use narramix::infrastructure::worker::{RenderWorker, RenderWorkerConfig};
use tokio::sync::mpsc;

/// 已结束任务的清理周期
const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("narramix {}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.storage.artifacts_dir).await?;
    if let Some(parent) = config.cache.path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let public_base_url = config.server.public_base_url();

    // 外部服务
    let tts_engine = build_tts_engine(&config)?;
    if !tts_engine.health_check().await {
        // 服务可能晚于本进程启动，合成时仍按重试策略处理
        tracing::warn!(url = %config.tts.url, "TTS service is not reachable yet");
    }
    let classifier: Arc<dyn MoodClassifierPort> = Arc::new(HttpMoodClassifier::new(
        HttpMoodClassifierConfig {
            base_url: config.classifier.url.clone(),
            timeout_secs: config.classifier.timeout_secs,
        },
    )?);

    // 素材库与成品存储
    let asset_store = Arc::new(FileAssetStore::new(
        &config.assets.dir,
        config
            .assets
            .public_url
            .clone()
            .unwrap_or_else(|| public_base_url.clone()),
    ));
    let storage =
        Arc::new(FileArtifactStorage::new(&config.storage.artifacts_dir, &public_base_url).await?);

    // 选曲，兜底素材缺失时拒绝启动
    let random = Arc::new(StdRandomSource::new(config.pipeline.drama_seed));
    let resolver = Arc::new(MusicResolver::new(
        asset_store.clone(),
        random,
        config.assets.resolver_config(),
    ));
    resolver.verify_last_resort().await?;

    // 渲染流水线
    let mut pipeline = NarrationPipeline::new(
        config.pipeline.pipeline_config(&config.tts, &config.classifier),
        classifier,
        tts_engine,
        resolver,
        asset_store,
        Arc::new(SymphoniaCodec::new()),
        storage.clone(),
    );
    let narration_cache = if config.cache.enabled {
        let cache = SledNarrationCache::new(&SledCacheConfig {
            db_path: config.cache.path.clone(),
            max_size_bytes: config.cache.max_size_bytes,
        })?
        .arc();
        let stats = cache.stats().await;
        tracing::info!(
            entries = stats.total_entries,
            size_bytes = stats.total_size_bytes,
            max_size_bytes = stats.max_size_bytes,
            "Narration cache opened"
        );
        pipeline = pipeline.with_cache(cache.clone());
        Some(cache)
    } else {
        tracing::info!("Narration cache disabled");
        None
    };
    let pipeline = Arc::new(pipeline);

    // 任务队列与 Worker
    let (job_tx, job_rx) = mpsc::channel(config.worker.queue_capacity);
    let job_manager = InMemoryJobManager::new(job_tx).arc();
    let event_publisher = EventPublisher::new().arc();

    let worker = RenderWorker::new(
        RenderWorkerConfig {
            max_concurrent_jobs: config.worker.max_concurrent_jobs,
        },
        job_rx,
        job_manager.clone(),
        pipeline,
        storage,
        event_publisher.clone(),
    );
    tokio::spawn(worker.run());
    spawn_cleanup(job_manager.clone(), config.worker.job_retention_secs);

    // HTTP 服务器
    let defaults = RenderDefaults {
        segment: config.pipeline.segment_config(),
        voice_ref: config.tts.voice_ref.clone(),
        output_format: config.pipeline.output_format,
    };
    let state = AppState::new(
        job_manager,
        event_publisher,
        defaults,
        &config.storage.artifacts_dir,
        &config.assets.dir,
    );
    let server = HttpServer::new(
        ServerConfig::new(&config.server.host, config.server.port),
        state,
    );

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    if let Some(cache) = narration_cache {
        if let Err(e) = cache.flush() {
            tracing::warn!(error = %e, "Failed to flush narration cache");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},narramix={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 配置了固定音频时使用 FakeTtsClient（联调用）
fn build_tts_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn TtsEnginePort>> {
    match &config.tts.fake_audio_path {
        Some(path) => {
            tracing::warn!(path = %path.display(), "Using fake TTS engine");
            Ok(Arc::new(FakeTtsClient::new(FakeTtsClientConfig::new(path))?))
        }
        None => Ok(Arc::new(HttpTtsClient::new(
            HttpTtsClientConfig::new(&config.tts.url).with_timeout(config.tts.timeout_secs),
        )?)),
    }
}

fn spawn_cleanup(job_manager: Arc<InMemoryJobManager>, retention_secs: u64) {
    let retention = chrono::Duration::seconds(retention_secs as i64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = job_manager.cleanup(chrono::Utc::now() - retention);
            if removed > 0 {
                tracing::info!(removed, "Expired jobs removed");
            }
        }
    });
}
