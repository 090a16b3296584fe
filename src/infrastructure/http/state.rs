//! Application State
//!
//! HTTP 层共享状态：任务端口、事件发布器和命令处理器

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::{
    CancelRenderJobHandler, JobManagerPort, QueryJobStatusHandler, RenderDefaults,
    SubmitRenderJobHandler,
};
use crate::infrastructure::events::EventPublisher;

/// 应用状态
pub struct AppState {
    pub job_manager: Arc<dyn JobManagerPort>,
    pub event_publisher: Arc<EventPublisher>,

    pub submit_render_handler: SubmitRenderJobHandler,
    pub cancel_render_handler: CancelRenderJobHandler,
    pub query_status_handler: QueryJobStatusHandler,

    /// 成品目录，挂载到 /artifacts
    pub artifacts_dir: PathBuf,
    /// 背景音乐目录，挂载到 /assets
    pub assets_dir: PathBuf,
}

impl AppState {
    pub fn new(
        job_manager: Arc<dyn JobManagerPort>,
        event_publisher: Arc<EventPublisher>,
        defaults: RenderDefaults,
        artifacts_dir: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            submit_render_handler: SubmitRenderJobHandler::new(job_manager.clone(), defaults),
            cancel_render_handler: CancelRenderJobHandler::new(job_manager.clone()),
            query_status_handler: QueryJobStatusHandler::new(job_manager.clone()),
            job_manager,
            event_publisher,
            artifacts_dir: artifacts_dir.into(),
            assets_dir: assets_dir.into(),
        }
    }
}
