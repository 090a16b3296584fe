//! Events - 任务事件推送

mod publisher;

pub use publisher::{EventPublisher, JobProgressReporter, WsEvent};
