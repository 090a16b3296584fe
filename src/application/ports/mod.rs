//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod artifact_storage;
mod asset_store;
mod audio_codec;
mod job_manager;
mod mood_classifier;
mod narration_cache;
mod progress_reporter;
mod tts_engine;

pub use artifact_storage::{ArtifactStoragePort, StoredArtifact, UploadError};
pub use asset_store::{AssetStoreError, AssetStorePort};
pub use audio_codec::{AudioCodecPort, AudioFormat, CodecError, EncodeConfig};
pub use job_manager::{JobError, JobManagerPort, JobState, RenderJob, RenderResult};
pub use mood_classifier::{ClassifierError, MoodClassifierPort};
pub use narration_cache::{
    generate_cache_key, CacheError, CacheMetadata, CacheStats, NarrationCachePort,
};
pub use progress_reporter::{NoopProgress, ProgressReporter};
pub use tts_engine::{SynthesisRequest, SynthesisResponse, TtsEnginePort, TtsError};
