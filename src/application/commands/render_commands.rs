//! Render Commands - 渲染任务相关命令

use chrono::{DateTime, Utc};

use crate::application::error::JobFailure;
use crate::application::ports::{AudioFormat, JobState, RenderResult};

/// 提交渲染任务命令
#[derive(Debug, Clone)]
pub struct SubmitRenderJobCommand {
    pub text: String,
    pub title: Option<String>,
    /// 为空时使用配置的默认音色
    pub voice_ref: Option<String>,
    /// 为空时使用配置的默认输出格式
    pub output_format: Option<AudioFormat>,
}

/// 提交渲染任务响应
#[derive(Debug, Clone)]
pub struct SubmitRenderJobResponse {
    pub job_id: String,
    pub total_paragraphs: usize,
    pub state: JobState,
}

/// 取消渲染任务命令
#[derive(Debug, Clone)]
pub struct CancelRenderJobCommand {
    pub job_id: String,
}

/// 取消渲染任务响应
#[derive(Debug, Clone)]
pub struct CancelRenderJobResponse {
    pub job_id: String,
    /// 是否实际发生了取消（已结束的任务返回 false）
    pub cancelled: bool,
    pub state: JobState,
}

/// 查询任务状态命令
#[derive(Debug, Clone)]
pub struct QueryJobStatusCommand {
    pub job_ids: Vec<String>,
}

/// 任务状态信息
#[derive(Debug, Clone)]
pub struct JobStatusInfo {
    pub job_id: String,
    pub title: String,
    pub state: JobState,
    pub total_paragraphs: usize,
    pub completed_paragraphs: usize,
    pub result: Option<RenderResult>,
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 查询任务状态响应
#[derive(Debug, Clone)]
pub struct QueryJobStatusResponse {
    pub jobs: Vec<JobStatusInfo>,
}
