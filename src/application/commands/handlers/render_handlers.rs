//! Render Command Handlers

use std::sync::Arc;

use crate::application::commands::render_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{AudioFormat, JobManagerPort, JobState, RenderJob};
use crate::domain::{segment_text, SegmentConfig};

/// 未提供标题时从首段截取的字符数
const DERIVED_TITLE_CHARS: usize = 32;

/// 提交时使用的默认值
#[derive(Debug, Clone)]
pub struct RenderDefaults {
    pub segment: SegmentConfig,
    pub voice_ref: String,
    pub output_format: AudioFormat,
}

/// SubmitRenderJob Handler - 提交渲染任务
///
/// 提交前先分段，空文本在这里同步返回验证错误，不会进入队列
pub struct SubmitRenderJobHandler {
    job_manager: Arc<dyn JobManagerPort>,
    defaults: RenderDefaults,
}

impl SubmitRenderJobHandler {
    pub fn new(job_manager: Arc<dyn JobManagerPort>, defaults: RenderDefaults) -> Self {
        Self {
            job_manager,
            defaults,
        }
    }

    pub fn handle(&self, cmd: SubmitRenderJobCommand) -> Result<SubmitRenderJobResponse, ApplicationError> {
        let segmentation = segment_text(&cmd.text, &self.defaults.segment)?;

        let voice_ref = cmd
            .voice_ref
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.defaults.voice_ref.clone());
        if voice_ref.trim().is_empty() {
            return Err(ApplicationError::validation("voice_ref is required"));
        }

        let title = cmd
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                segmentation
                    .paragraphs
                    .first()
                    .map(|p| p.chars().take(DERIVED_TITLE_CHARS).collect())
                    .unwrap_or_default()
            });

        let output_format = cmd.output_format.unwrap_or(self.defaults.output_format);
        let total_paragraphs = segmentation.len();
        let job = RenderJob::new(title, cmd.text, voice_ref, output_format, total_paragraphs);
        let job_id = self.job_manager.submit(job)?;

        tracing::info!(
            job_id = %job_id,
            paragraphs = total_paragraphs,
            truncated = segmentation.is_truncated(),
            format = %output_format,
            "Render job submitted"
        );

        Ok(SubmitRenderJobResponse {
            job_id,
            total_paragraphs,
            state: JobState::Pending,
        })
    }
}

/// CancelRenderJob Handler - 取消渲染任务
pub struct CancelRenderJobHandler {
    job_manager: Arc<dyn JobManagerPort>,
}

impl CancelRenderJobHandler {
    pub fn new(job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self { job_manager }
    }

    pub fn handle(&self, cmd: CancelRenderJobCommand) -> Result<CancelRenderJobResponse, ApplicationError> {
        if self.job_manager.get_state(&cmd.job_id).is_none() {
            return Err(ApplicationError::not_found("Job", cmd.job_id));
        }

        let cancelled = self.job_manager.cancel(&cmd.job_id);
        let state = self
            .job_manager
            .get_state(&cmd.job_id)
            .ok_or_else(|| ApplicationError::not_found("Job", cmd.job_id.clone()))?;

        tracing::info!(job_id = %cmd.job_id, cancelled, state = state.as_str(), "Cancel requested");

        Ok(CancelRenderJobResponse {
            job_id: cmd.job_id,
            cancelled,
            state,
        })
    }
}

/// QueryJobStatus Handler - 查询任务状态
pub struct QueryJobStatusHandler {
    job_manager: Arc<dyn JobManagerPort>,
}

impl QueryJobStatusHandler {
    pub fn new(job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self { job_manager }
    }

    /// 未知的 job_id 直接忽略
    pub fn handle(&self, cmd: QueryJobStatusCommand) -> QueryJobStatusResponse {
        let jobs = cmd
            .job_ids
            .iter()
            .filter_map(|job_id| {
                self.job_manager.get_job(job_id).map(|job| JobStatusInfo {
                    job_id: job.job_id,
                    title: job.title,
                    state: job.state,
                    total_paragraphs: job.total_paragraphs,
                    completed_paragraphs: job.completed_paragraphs,
                    result: job.result,
                    failure: job.failure,
                    created_at: job.created_at,
                    completed_at: job.completed_at,
                })
            })
            .collect();

        QueryJobStatusResponse { jobs }
    }
}
