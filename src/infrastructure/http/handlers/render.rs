//! Render Handlers - 提交、查询、取消渲染任务

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{
    CancelRenderJobCommand, QueryJobStatusCommand, SubmitRenderJobCommand,
};
use crate::infrastructure::http::dto::{
    ApiResponse, CancelRenderRequest, CancelRenderResponseDto, JobStatusDto, QueryStatusRequest,
    QueryStatusResponseDto, SubmitRenderRequest, SubmitRenderResponseDto,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 单次状态查询允许的最大任务数
const MAX_STATUS_QUERY: usize = 100;

pub async fn submit_render(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRenderRequest>,
) -> Result<Json<ApiResponse<SubmitRenderResponseDto>>, ApiError> {
    let cmd = SubmitRenderJobCommand {
        text: req.text,
        title: req.title,
        voice_ref: req.voice_ref,
        output_format: req.output_format,
    };

    let result = state.submit_render_handler.handle(cmd)?;
    Ok(Json(ApiResponse::success(result.into())))
}

pub async fn query_render_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryStatusRequest>,
) -> Result<Json<ApiResponse<QueryStatusResponseDto>>, ApiError> {
    if req.job_ids.len() > MAX_STATUS_QUERY {
        return Err(ApiError::BadRequest(format!(
            "at most {} job_ids per query",
            MAX_STATUS_QUERY
        )));
    }

    let result = state.query_status_handler.handle(QueryJobStatusCommand {
        job_ids: req.job_ids,
    });

    Ok(Json(ApiResponse::success(QueryStatusResponseDto {
        jobs: result.jobs.into_iter().map(JobStatusDto::from).collect(),
    })))
}

pub async fn cancel_render(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelRenderRequest>,
) -> Result<Json<ApiResponse<CancelRenderResponseDto>>, ApiError> {
    let result = state
        .cancel_render_handler
        .handle(CancelRenderJobCommand { job_id: req.job_id })?;

    // JobCancelled 事件由 Worker 在出队或中断时发布
    Ok(Json(ApiResponse::success(result.into())))
}
