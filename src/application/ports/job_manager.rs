//! Job Manager Port - 渲染任务管理
//!
//! 定义任务管理的抽象接口，具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::audio_codec::AudioFormat;
use crate::application::error::JobFailure;

/// Job Manager 错误
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Job queue is full")]
    QueueFull,

    #[error("Job queue closed")]
    QueueClosed,
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// 等待执行
    Pending,
    /// 正在渲染
    Running,
    /// 渲染完成
    Completed,
    /// 渲染失败
    Failed,
    /// 已取消
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// 终态不再允许迁移
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// 渲染结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    /// 成品访问 URL
    pub url: String,
    /// 成品逻辑路径
    pub path: String,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    /// 段落数量
    pub paragraphs: usize,
    pub size_bytes: u64,
    pub format: AudioFormat,
}

/// 渲染任务
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub job_id: String,
    pub title: String,
    pub text: String,
    pub voice_ref: String,
    pub output_format: AudioFormat,
    pub state: JobState,
    pub total_paragraphs: usize,
    pub completed_paragraphs: usize,
    pub result: Option<RenderResult>,
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    pub fn new(
        title: String,
        text: String,
        voice_ref: String,
        output_format: AudioFormat,
        total_paragraphs: usize,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            title,
            text,
            voice_ref,
            output_format,
            state: JobState::Pending,
            total_paragraphs,
            completed_paragraphs: 0,
            result: None,
            failure: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Job Manager Port
///
/// 管理渲染任务的生命周期，所有状态存储在内存中
pub trait JobManagerPort: Send + Sync {
    /// 提交任务到队列，返回 job_id
    fn submit(&self, job: RenderJob) -> Result<String, JobError>;

    /// 获取任务
    fn get_job(&self, job_id: &str) -> Option<RenderJob>;

    /// 获取任务状态
    fn get_state(&self, job_id: &str) -> Option<JobState>;

    /// 设置任务状态
    fn set_state(&self, job_id: &str, state: JobState) -> Result<(), JobError>;

    /// 更新段落进度
    fn set_progress(&self, job_id: &str, completed_paragraphs: usize) -> Result<(), JobError>;

    /// 设置任务完成并记录结果
    fn set_completed(&self, job_id: &str, result: RenderResult) -> Result<(), JobError>;

    /// 设置任务失败并记录失败信息
    fn set_failed(&self, job_id: &str, failure: JobFailure) -> Result<(), JobError>;

    /// 取消任务，返回是否实际发生了取消
    fn cancel(&self, job_id: &str) -> bool;

    /// 获取任务的取消令牌
    fn cancellation_token(&self, job_id: &str) -> Option<CancellationToken>;

    /// 检查任务是否已取消
    fn is_cancelled(&self, job_id: &str) -> bool;

    /// 未结束（排队或渲染中）的任务数
    fn active_jobs(&self) -> usize;

    /// 清理已结束且早于截止时间的任务，返回清理数量
    fn cleanup(&self, older_than: DateTime<Utc>) -> usize;
}
