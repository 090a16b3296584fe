//! HTTP Middleware
//!
//! 4xx/5xx 响应日志，带请求耗时

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// 超过该耗时的成功请求记一条 warn
const SLOW_REQUEST_MS: u64 = 5_000;

/// HTTP 状态码日志中间件
///
/// errno 形式的业务错误在 `ApiError::into_response` 中记录，这里只看 HTTP 状态码
/// （静态文件 404、请求体解析失败等）
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    } else if elapsed_ms > SLOW_REQUEST_MS {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms, "Slow HTTP request");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use tower::util::ServiceExt;

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn json_handler(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
        Json(body)
    }

    async fn error_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/ok", get(ok_handler))
            .route("/echo", post(json_handler))
            .route("/error", get(error_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    async fn status_of(request: HttpRequest<Body>) -> StatusCode {
        create_test_router()
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_passes_through_success() {
        let request = HttpRequest::builder()
            .uri("/ok")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_is_client_error() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert!(status_of(request).await.is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_route_and_server_error() {
        let missing = HttpRequest::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(missing).await, StatusCode::NOT_FOUND);

        let failing = HttpRequest::builder()
            .uri("/error")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(failing).await, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
