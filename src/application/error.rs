//! 应用层错误定义
//!
//! 统一的命令错误类型，以及渲染流水线的阶段错误

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SegmentError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 任务队列繁忙
    #[error("Service busy: {0}")]
    Busy(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<SegmentError> for ApplicationError {
    fn from(err: SegmentError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<crate::application::ports::JobError> for ApplicationError {
    fn from(err: crate::application::ports::JobError) -> Self {
        use crate::application::ports::JobError;
        match err {
            JobError::NotFound(id) => Self::not_found("Job", id),
            JobError::InvalidStateTransition(msg) => Self::InvalidState(msg),
            busy @ (JobError::QueueFull | JobError::QueueClosed) => Self::Busy(busy.to_string()),
            other => Self::InternalError(other.to_string()),
        }
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Input,
    Classification,
    Synthesis,
    AssetResolution,
    Mixing,
    Render,
    Upload,
    Cancelled,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Input => "input",
            PipelineStage::Classification => "classification",
            PipelineStage::Synthesis => "synthesis",
            PipelineStage::AssetResolution => "asset_resolution",
            PipelineStage::Mixing => "mixing",
            PipelineStage::Render => "render",
            PipelineStage::Upload => "upload",
            PipelineStage::Cancelled => "cancelled",
        }
    }
}

/// 流水线错误
///
/// 每个变体携带失败阶段，段落级阶段携带段落索引
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    Input(#[from] SegmentError),

    #[error("Classification failed for paragraph {index}: {message}")]
    Classification { index: usize, message: String },

    #[error("Synthesis failed for paragraph {index} after {attempts} attempt(s): {message}")]
    Synthesis {
        index: usize,
        attempts: u32,
        message: String,
    },

    #[error("Asset resolution failed{}: {message}", fmt_index(.index))]
    AssetResolution {
        index: Option<usize>,
        message: String,
    },

    #[error("Mixing failed for paragraph {index}: {message}")]
    Mixing { index: usize, message: String },

    #[error("Render failed{}: {message}", fmt_index(.index))]
    Render {
        index: Option<usize>,
        message: String,
    },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Job cancelled")]
    Cancelled,
}

fn fmt_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" for paragraph {}", i),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Input(_) => PipelineStage::Input,
            PipelineError::Classification { .. } => PipelineStage::Classification,
            PipelineError::Synthesis { .. } => PipelineStage::Synthesis,
            PipelineError::AssetResolution { .. } => PipelineStage::AssetResolution,
            PipelineError::Mixing { .. } => PipelineStage::Mixing,
            PipelineError::Render { .. } => PipelineStage::Render,
            PipelineError::Upload(_) => PipelineStage::Upload,
            PipelineError::Cancelled => PipelineStage::Cancelled,
        }
    }

    pub fn paragraph_index(&self) -> Option<usize> {
        match self {
            PipelineError::Classification { index, .. }
            | PipelineError::Synthesis { index, .. }
            | PipelineError::Mixing { index, .. } => Some(*index),
            PipelineError::AssetResolution { index, .. } | PipelineError::Render { index, .. } => {
                *index
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

/// 任务失败信息（对外暴露）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
    pub message: String,
}

impl From<&PipelineError> for JobFailure {
    fn from(err: &PipelineError) -> Self {
        Self {
            stage: err.stage(),
            paragraph_index: err.paragraph_index(),
            message: err.to_string(),
        }
    }
}
