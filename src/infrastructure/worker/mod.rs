//! Worker Layer - Background Job Processing
//!
//! 实现 RenderWorker，从队列消费渲染任务

mod render_worker;

pub use render_worker::{RenderWorker, RenderWorkerConfig};
