use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use taskevents_domain::{PushAck, TopicSubscription, REMINDERS_TOPIC, TASK_EVENTS_TOPIC};
use taskevents_infrastructure::{consume_push, IdempotencyCache};

use crate::handlers::AuditReaction;

pub const SERVICE_NAME: &str = "audit-service";

/// 审计服务应用状态
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<IdempotencyCache>,
    pub reaction: Arc<AuditReaction>,
    pub pubsub_name: String,
}

/// 创建审计服务路由
///
/// 审计服务订阅两个主题，任务和提醒事件走各自的推送路由。
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/dapr/subscribe", get(subscriptions))
        .route("/events/task", post(handle_push))
        .route("/events/reminder", post(handle_push))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn subscriptions(State(state): State<AppState>) -> Json<Vec<TopicSubscription>> {
    Json(vec![
        TopicSubscription::raw_payload(&state.pubsub_name, TASK_EVENTS_TOPIC, "/events/task"),
        TopicSubscription::raw_payload(&state.pubsub_name, REMINDERS_TOPIC, "/events/reminder"),
    ])
}

/// 推送端点
///
/// 消息体按原始字节接收，任何输入都回复HTTP 200，
/// 重投与否由响应体里的状态码决定。
async fn handle_push(State(state): State<AppState>, body: Bytes) -> Json<PushAck> {
    Json(consume_push(state.cache.as_ref(), state.reaction.as_ref(), &body).await)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": SERVICE_NAME}))
}

async fn ready() -> Json<Value> {
    Json(json!({"status": "ready", "service": SERVICE_NAME}))
}
