//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、MoodClassifier、AssetStore、JobManager 等）
//! - services: 选曲、渲染流水线、重试
//! - commands: CQRS 命令及处理器
//! - error: 应用层错误与流水线错误

pub mod commands;
pub mod error;
pub mod ports;
pub mod services;

// Re-exports
pub use commands::{
    handlers::{
        CancelRenderJobHandler, QueryJobStatusHandler, RenderDefaults, SubmitRenderJobHandler,
    },
    CancelRenderJobCommand, CancelRenderJobResponse, JobStatusInfo, QueryJobStatusCommand,
    QueryJobStatusResponse, SubmitRenderJobCommand, SubmitRenderJobResponse,
};

pub use error::{ApplicationError, JobFailure, PipelineError, PipelineStage};

pub use ports::{
    generate_cache_key, ArtifactStoragePort, AssetStoreError, AssetStorePort, AudioCodecPort,
    AudioFormat, CacheError, CacheMetadata, CacheStats, ClassifierError, CodecError,
    EncodeConfig, JobError, JobManagerPort, JobState, MoodClassifierPort, NarrationCachePort,
    NoopProgress, ProgressReporter, RenderJob, RenderResult, StoredArtifact, SynthesisRequest,
    SynthesisResponse, TtsEnginePort, TtsError, UploadError,
};

pub use services::{
    MixMode, MusicResolver, MusicResolverConfig, NarrationPipeline, PipelineConfig,
    RenderRequest, RetryPolicy,
};
