//! Application Services - 跨端口的用例编排
//!
//! - music_resolver: 情绪 → 背景素材（候选列表 + 存在性缓存）
//! - pipeline: 单个渲染任务的端到端执行
//! - retry: 外部调用的超时与有限重试

pub mod music_resolver;
pub mod pipeline;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use music_resolver::{
    resolution_plan, AssetExistenceCache, CandidateKey, ExistenceCacheStats, FilenameConvention,
    MusicResolver, MusicResolverConfig,
};
pub use pipeline::{MixMode, NarrationPipeline, PipelineConfig, RenderRequest};
pub use retry::{retry_with_timeout, RetryError, RetryPolicy};
