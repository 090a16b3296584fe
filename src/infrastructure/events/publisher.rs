//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现。进度事件只是遥测，丢失不影响任务结果。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::error::JobFailure;
use crate::application::ports::{JobManagerPort, ProgressReporter, RenderResult};

/// 广播通道容量
const CHANNEL_CAPACITY: usize = 256;

/// WebSocket 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 任务开始渲染
    JobStarted {
        job_id: String,
        total_paragraphs: usize,
    },
    /// 段落完成
    JobProgress {
        job_id: String,
        paragraph_index: usize,
        completed_paragraphs: usize,
        total_paragraphs: usize,
    },
    /// 任务完成
    JobCompleted {
        job_id: String,
        url: String,
        duration_ms: u64,
    },
    /// 任务失败
    JobFailed {
        job_id: String,
        failure: JobFailure,
    },
    /// 任务已取消
    JobCancelled { job_id: String },
}

impl WsEvent {
    pub fn job_id(&self) -> &str {
        match self {
            WsEvent::JobStarted { job_id, .. }
            | WsEvent::JobProgress { job_id, .. }
            | WsEvent::JobCompleted { job_id, .. }
            | WsEvent::JobFailed { job_id, .. }
            | WsEvent::JobCancelled { job_id } => job_id,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全部任务事件
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.channel.subscribe()
    }

    pub fn publish_job_started(&self, job_id: &str, total_paragraphs: usize) {
        self.publish(WsEvent::JobStarted {
            job_id: job_id.to_string(),
            total_paragraphs,
        });
    }

    pub fn publish_job_progress(
        &self,
        job_id: &str,
        paragraph_index: usize,
        completed_paragraphs: usize,
        total_paragraphs: usize,
    ) {
        self.publish(WsEvent::JobProgress {
            job_id: job_id.to_string(),
            paragraph_index,
            completed_paragraphs,
            total_paragraphs,
        });
    }

    pub fn publish_job_completed(&self, job_id: &str, result: &RenderResult) {
        self.publish(WsEvent::JobCompleted {
            job_id: job_id.to_string(),
            url: result.url.clone(),
            duration_ms: result.duration_ms,
        });
    }

    pub fn publish_job_failed(&self, job_id: &str, failure: &JobFailure) {
        self.publish(WsEvent::JobFailed {
            job_id: job_id.to_string(),
            failure: failure.clone(),
        });
    }

    pub fn publish_job_cancelled(&self, job_id: &str) {
        self.publish(WsEvent::JobCancelled {
            job_id: job_id.to_string(),
        });
    }

    fn publish(&self, event: WsEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(job_id = %e.0.job_id(), "No event subscribers");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// 把流水线进度同时写入任务管理器并广播
pub struct JobProgressReporter {
    job_manager: Arc<dyn JobManagerPort>,
    publisher: Arc<EventPublisher>,
}

impl JobProgressReporter {
    pub fn new(job_manager: Arc<dyn JobManagerPort>, publisher: Arc<EventPublisher>) -> Self {
        Self {
            job_manager,
            publisher,
        }
    }
}

impl ProgressReporter for JobProgressReporter {
    fn segmented(&self, job_id: &str, total: usize) {
        self.publisher.publish_job_started(job_id, total);
    }

    fn paragraph_completed(&self, job_id: &str, index: usize, completed: usize, total: usize) {
        if let Err(e) = self.job_manager.set_progress(job_id, completed) {
            tracing::debug!(job_id = %job_id, error = %e, "Progress update dropped");
        }
        self.publisher
            .publish_job_progress(job_id, index, completed, total);
    }
}
