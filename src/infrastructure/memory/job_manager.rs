//! In-Memory Job Manager Implementation

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::application::error::JobFailure;
use crate::application::ports::{JobError, JobManagerPort, JobState, RenderJob, RenderResult};

/// 内存任务管理器
pub struct InMemoryJobManager {
    /// job_id -> RenderJob
    jobs: DashMap<String, RenderJob>,
    /// job_id -> 取消令牌
    tokens: DashMap<String, CancellationToken>,
    /// 任务队列发送端
    queue_sender: mpsc::Sender<String>,
}

impl InMemoryJobManager {
    pub fn new(queue_sender: mpsc::Sender<String>) -> Self {
        Self {
            jobs: DashMap::new(),
            tokens: DashMap::new(),
            queue_sender,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn update<F>(&self, job_id: &str, f: F) -> Result<(), JobError>
    where
        F: FnOnce(&mut RenderJob) -> Result<(), JobError>,
    {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        f(&mut job)
    }
}

fn ensure_not_terminal(job: &RenderJob, to: JobState) -> Result<(), JobError> {
    if job.state.is_terminal() {
        return Err(JobError::InvalidStateTransition(format!(
            "{} -> {} for job {}",
            job.state.as_str(),
            to.as_str(),
            job.job_id
        )));
    }
    Ok(())
}

impl JobManagerPort for InMemoryJobManager {
    fn submit(&self, job: RenderJob) -> Result<String, JobError> {
        let job_id = job.job_id.clone();
        if self.jobs.contains_key(&job_id) {
            return Err(JobError::AlreadyExists(job_id));
        }

        self.jobs.insert(job_id.clone(), job);
        self.tokens.insert(job_id.clone(), CancellationToken::new());

        // 发送到队列，失败时撤销登记
        if let Err(e) = self.queue_sender.try_send(job_id.clone()) {
            self.jobs.remove(&job_id);
            self.tokens.remove(&job_id);
            tracing::warn!(job_id = %job_id, error = %e, "Failed to enqueue job");
            return Err(match e {
                TrySendError::Full(_) => JobError::QueueFull,
                TrySendError::Closed(_) => JobError::QueueClosed,
            });
        }

        tracing::debug!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }

    fn get_job(&self, job_id: &str) -> Option<RenderJob> {
        self.jobs.get(job_id).map(|j| j.clone())
    }

    fn get_state(&self, job_id: &str) -> Option<JobState> {
        self.jobs.get(job_id).map(|j| j.state)
    }

    fn set_state(&self, job_id: &str, state: JobState) -> Result<(), JobError> {
        self.update(job_id, |job| {
            ensure_not_terminal(job, state)?;
            let old_state = job.state;
            job.state = state;
            if state.is_terminal() {
                job.completed_at = Some(Utc::now());
            }
            tracing::debug!(
                job_id = %job_id,
                old_state = ?old_state,
                new_state = ?state,
                "Job state changed"
            );
            Ok(())
        })
    }

    fn set_progress(&self, job_id: &str, completed_paragraphs: usize) -> Result<(), JobError> {
        self.update(job_id, |job| {
            job.completed_paragraphs = completed_paragraphs.min(job.total_paragraphs);
            Ok(())
        })
    }

    fn set_completed(&self, job_id: &str, result: RenderResult) -> Result<(), JobError> {
        self.update(job_id, |job| {
            ensure_not_terminal(job, JobState::Completed)?;
            job.state = JobState::Completed;
            job.completed_paragraphs = result.paragraphs;
            job.total_paragraphs = result.paragraphs;
            job.result = Some(result);
            job.completed_at = Some(Utc::now());
            Ok(())
        })?;
        self.tokens.remove(job_id);
        Ok(())
    }

    fn set_failed(&self, job_id: &str, failure: JobFailure) -> Result<(), JobError> {
        self.update(job_id, |job| {
            ensure_not_terminal(job, JobState::Failed)?;
            job.state = JobState::Failed;
            job.failure = Some(failure);
            job.completed_at = Some(Utc::now());
            Ok(())
        })?;
        self.tokens.remove(job_id);
        Ok(())
    }

    fn cancel(&self, job_id: &str) -> bool {
        let cancelled = self
            .update(job_id, |job| {
                ensure_not_terminal(job, JobState::Cancelled)?;
                job.state = JobState::Cancelled;
                job.completed_at = Some(Utc::now());
                Ok(())
            })
            .is_ok();

        if cancelled {
            if let Some((_, token)) = self.tokens.remove(job_id) {
                token.cancel();
            }
            tracing::debug!(job_id = %job_id, "Job cancelled");
        }
        cancelled
    }

    fn cancellation_token(&self, job_id: &str) -> Option<CancellationToken> {
        self.tokens.get(job_id).map(|t| t.clone())
    }

    fn is_cancelled(&self, job_id: &str) -> bool {
        self.jobs
            .get(job_id)
            .map(|j| j.state == JobState::Cancelled)
            .unwrap_or(true) // 不存在的任务视为已取消
    }

    fn active_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| !j.state.is_terminal()).count()
    }

    fn cleanup(&self, older_than: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !(job.state.is_terminal() && job.completed_at.map_or(false, |t| t < older_than))
        });
        let removed = before - self.jobs.len();
        if removed > 0 {
            tracing::debug!(removed, "Finished jobs cleaned up");
        }
        removed
    }
}
