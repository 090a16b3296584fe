//! HTTP Server
//!
//! 组装中间件栈并带优雅关闭地启动 axum

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 提交的全文上限
const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// 浏览器缓存 CORS 预检结果的时长
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 完整的应用 Router：路由 + 请求体上限 + 错误日志 + Trace + CORS
pub fn build_app(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers(Any)
        .max_age(CORS_MAX_AGE);

    create_routes(&state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(middleware::from_fn(error_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 启动服务器，`shutdown_signal` 完成后停止接收新连接并等待在途请求结束
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_app(self.state, self.config.body_limit_bytes);
        let listener = TcpListener::bind(self.config.addr()).await?;
        tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
    }
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
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    fn app(dir: &TempDir, body_limit: usize) -> (Router, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(4);
        let state = AppState::new(
            InMemoryJobManager::new(tx).arc(),
            EventPublisher::new().arc(),
            RenderDefaults {
                segment: SegmentConfig::default(),
                voice_ref: "narrator".to_string(),
                output_format: AudioFormat::Wav,
            },
            dir.path(),
            dir.path(),
        );
        (build_app(Arc::new(state), body_limit), rx)
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let dir = TempDir::new().unwrap();
        let (app, _rx) = app(&dir, DEFAULT_BODY_LIMIT);
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/render/submit")
            .header("origin", "http://player.local")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn test_body_limit_rejects_large_text() {
        let dir = TempDir::new().unwrap();
        let (app, _rx) = app(&dir, 64);
        let text = "x".repeat(256);
        let request = Request::builder()
            .method("POST")
            .uri("/api/render/submit")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"text":"{}"}}"#, text)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::new("127.0.0.1", 5060);
        assert_eq!(config.addr(), "127.0.0.1:5060");
        assert_eq!(config.body_limit_bytes, DEFAULT_BODY_LIMIT);
    }
}
