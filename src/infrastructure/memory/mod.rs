//! Memory Layer - In-Memory State Management
//!
//! 实现 JobManager，管理渲染任务的内存状态与取消令牌

mod job_manager;

pub use job_manager::InMemoryJobManager;
