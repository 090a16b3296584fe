//! narramix - 有声旁白渲染服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Paragraph: 文本分段
//! - Mood: 情绪元数据与音乐类别映射
//! - Audio: PCM 规整、包络、混音、拼接
//!
//! 应用层 (application/):
//! - Ports: TtsEngine, MoodClassifier, AssetStore, ArtifactStorage, AudioCodec, NarrationCache, JobManager
//! - Services: 选曲、渲染流水线、重试
//! - Commands: 提交 / 取消 / 查询渲染任务
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: JobManager 内存实现
//! - Worker: RenderWorker 后台渲染
//! - Persistence: Sled 旁白缓存
//! - Adapters: TTS / 分类器客户端、素材库、成品存储、编解码
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
