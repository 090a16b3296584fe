//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping             GET   健康检查
//! - /api/render/submit    POST  提交渲染任务
//! - /api/render/status    POST  查询任务状态
//! - /api/render/cancel    POST  取消任务
//! - /ws/events            WS    任务事件（可选 ?job_id= 过滤）
//! - /artifacts/*          GET   成品文件
//! - /assets/*             GET   背景音乐素材

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes(state: &AppState) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
        .nest_service("/artifacts", ServeDir::new(&state.artifacts_dir))
        .nest_service("/assets", ServeDir::new(&state.assets_dir))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/render", render_routes())
}

/// Render 路由
fn render_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit", post(handlers::submit_render))
        .route("/status", post(handlers::query_render_status))
        .route("/cancel", post(handlers::cancel_render))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{AudioFormat, RenderDefaults};
    use crate::domain::SegmentConfig;
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::memory::InMemoryJobManager;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    struct TestApp {
        router: Router,
        _rx: mpsc::Receiver<String>,
        _artifacts: TempDir,
        _assets: TempDir,
    }

    fn app() -> TestApp {
        let artifacts = TempDir::new().unwrap();
        let assets = TempDir::new().unwrap();
        std::fs::create_dir_all(artifacts.path().join("renders")).unwrap();
        std::fs::write(artifacts.path().join("renders/done.wav"), b"RIFF").unwrap();
        std::fs::write(assets.path().join("fallback.mp3"), b"ID3").unwrap();

        let (tx, rx) = mpsc::channel(8);
        let state = AppState::new(
            InMemoryJobManager::new(tx).arc(),
            EventPublisher::new().arc(),
            RenderDefaults {
                segment: SegmentConfig::default(),
                voice_ref: "narrator".to_string(),
                output_format: AudioFormat::Wav,
            },
            artifacts.path(),
            assets.path(),
        );
        let router = create_routes(&state).with_state(Arc::new(state));
        TestApp {
            router,
            _rx: rx,
            _artifacts: artifacts,
            _assets: assets,
        }
    }

    async fn post_json(router: &Router, uri: &str, body: Value) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn get_status(router: &Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_submit_status_cancel_flow() {
        let app = app();

        let submitted = post_json(
            &app.router,
            "/api/render/submit",
            json!({"text": "First part.$Second part.", "output_format": "opus"}),
        )
        .await;
        assert_eq!(submitted["errno"], 0);
        assert_eq!(submitted["data"]["total_paragraphs"], 2);
        assert_eq!(submitted["data"]["state"], "pending");
        let job_id = submitted["data"]["job_id"].as_str().unwrap().to_string();

        let status = post_json(
            &app.router,
            "/api/render/status",
            json!({"job_ids": [job_id.clone(), "unknown"]}),
        )
        .await;
        let jobs = status["data"]["jobs"].as_array().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0]["title"], "First part.");
        assert_eq!(jobs[0]["completed_paragraphs"], 0);

        let cancelled = post_json(
            &app.router,
            "/api/render/cancel",
            json!({"job_id": job_id.clone()}),
        )
        .await;
        assert_eq!(cancelled["data"]["cancelled"], true);
        assert_eq!(cancelled["data"]["state"], "cancelled");
    }

    #[tokio::test]
    async fn test_business_errors_use_errno() {
        let app = app();

        let empty = post_json(&app.router, "/api/render/submit", json!({"text": "  "})).await;
        assert_eq!(empty["errno"], 400);
        assert!(empty["data"].is_null());

        let missing = post_json(&app.router, "/api/render/cancel", json!({"job_id": "nope"})).await;
        assert_eq!(missing["errno"], 404);
    }

    #[tokio::test]
    async fn test_ping_and_static_files() {
        let app = app();
        assert_eq!(get_status(&app.router, "/api/ping").await, StatusCode::OK);
        assert_eq!(
            get_status(&app.router, "/artifacts/renders/done.wav").await,
            StatusCode::OK
        );
        assert_eq!(
            get_status(&app.router, "/assets/fallback.mp3").await,
            StatusCode::OK
        );
        assert_eq!(
            get_status(&app.router, "/artifacts/renders/missing.wav").await,
            StatusCode::NOT_FOUND
        );
    }
}
