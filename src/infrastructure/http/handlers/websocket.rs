//! WebSocket Handler - 任务事件推送

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::infrastructure::events::WsEvent;
use crate::infrastructure::http::state::AppState;

/// 订阅过滤，缺省时推送全部任务事件
#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    pub job_id: Option<String>,
}

impl EventFilter {
    fn accepts(&self, event: &WsEvent) -> bool {
        self.job_id
            .as_deref()
            .map_or(true, |job_id| event.job_id() == job_id)
    }
}

/// 全局 WebSocket 连接处理
pub async fn events_websocket_handler(
    ws: WebSocketUpgrade,
    Query(filter): Query<EventFilter>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_socket(socket, filter, state))
}

async fn handle_events_socket(socket: WebSocket, filter: EventFilter, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.event_publisher.subscribe();

    tracing::info!(job_id = ?filter.job_id, "Events WebSocket connected");

    // 事件转发任务
    let forward_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    // 进度事件只是遥测，落后时丢弃即可
                    tracing::debug!(skipped, "Events WebSocket lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !filter.accepts(&event) {
                continue;
            }

            let msg = match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    // 接收客户端消息（心跳）
    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!("Events WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Events WebSocket error");
                    break;
                }
                // Ping 由 axum 自动回复
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = forward_task => {}
        _ = receive_task => {}
    }

    tracing::info!("Events WebSocket disconnected");
}
