//! 应用层 - 命令
//!
//! CQRS 命令侧：提交、取消、查询渲染任务

mod render_commands;

pub mod handlers;

pub use render_commands::*;
