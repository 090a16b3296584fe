//! Data Transfer Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{
    AudioFormat, CancelRenderJobResponse, JobFailure, JobStatusInfo, RenderResult,
    SubmitRenderJobResponse,
};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Render DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRenderRequest {
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub voice_ref: Option<String>,
    #[serde(default)]
    pub output_format: Option<AudioFormat>,
}

#[derive(Debug, Serialize)]
pub struct SubmitRenderResponseDto {
    pub job_id: String,
    pub total_paragraphs: usize,
    pub state: String,
}

impl From<SubmitRenderJobResponse> for SubmitRenderResponseDto {
    fn from(resp: SubmitRenderJobResponse) -> Self {
        Self {
            job_id: resp.job_id,
            total_paragraphs: resp.total_paragraphs,
            state: resp.state.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryStatusRequest {
    pub job_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobStatusDto {
    pub job_id: String,
    pub title: String,
    pub state: String,
    pub total_paragraphs: usize,
    pub completed_paragraphs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RenderResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<JobStatusInfo> for JobStatusDto {
    fn from(info: JobStatusInfo) -> Self {
        Self {
            job_id: info.job_id,
            title: info.title,
            state: info.state.as_str().to_string(),
            total_paragraphs: info.total_paragraphs,
            completed_paragraphs: info.completed_paragraphs,
            result: info.result,
            failure: info.failure,
            created_at: info.created_at,
            completed_at: info.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryStatusResponseDto {
    pub jobs: Vec<JobStatusDto>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRenderRequest {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelRenderResponseDto {
    pub job_id: String,
    pub cancelled: bool,
    pub state: String,
}

impl From<CancelRenderJobResponse> for CancelRenderResponseDto {
    fn from(resp: CancelRenderJobResponse) -> Self {
        Self {
            job_id: resp.job_id,
            cancelled: resp.cancelled,
            state: resp.state.as_str().to_string(),
        }
    }
}
