//! Progress Reporter Port - 渲染进度遥测
//!
//! 进度只用于展示，不参与正确性判断

/// Progress Reporter Port
pub trait ProgressReporter: Send + Sync {
    /// 分段完成，得到段落总数
    fn segmented(&self, job_id: &str, total_paragraphs: usize);

    /// 一个段落完成混音（完成顺序不保证与段落顺序一致）
    fn paragraph_completed(&self, job_id: &str, index: usize, completed: usize, total: usize);
}

/// 丢弃所有进度
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn segmented(&self, _job_id: &str, _total_paragraphs: usize) {}

    fn paragraph_completed(&self, _job_id: &str, _index: usize, _completed: usize, _total: usize) {}
}
