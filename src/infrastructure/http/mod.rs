//! HTTP Layer
//!
//! 渲染任务 REST API、任务事件 WebSocket、成品与素材的静态文件服务

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{build_app, HttpServer, ServerConfig};
pub use state::AppState;
