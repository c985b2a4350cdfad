use ::metrics::counter;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use taskevents_domain::{DeliveryStatus, EventEnvelope, EventReaction, PushAck};

use crate::idempotency::{IdempotencyCache, Reservation};
use crate::metrics::EVENTS_PROCESSED;

/// 推送事件消费管线
///
/// 三个服务共享的控制流：解析信封 → 去重预留 → 分发处理 →
/// 状态翻译。消息体按原始字节接收，任何输入都产生一个控制
/// 重投的响应，永远不会让错误穿出边界。
pub async fn consume_push<R>(cache: &IdempotencyCache, reaction: &R, body: &[u8]) -> PushAck
where
    R: EventReaction + ?Sized,
{
    let service = reaction.service_name();

    let raw: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            error!(service, "推送消息体不是合法JSON: {e}");
            record_outcome(service, "unknown", DeliveryStatus::Drop);
            return PushAck::new(DeliveryStatus::Drop);
        }
    };

    let envelope = EventEnvelope::parse(raw);
    let event_type = envelope.kind();
    debug!(service, event_id = %envelope.id, event_type = %event_type, "收到推送事件");

    if !reaction.accepts(&event_type) {
        debug!(service, event_type = %event_type, "事件类型不在职责范围内，忽略");
        record_outcome(service, envelope.event_type.as_str(), DeliveryStatus::Ignored);
        return PushAck::new(DeliveryStatus::Ignored);
    }

    let reservation = cache.check_and_reserve(&envelope.id);
    if reservation == Reservation::Duplicate {
        record_outcome(service, envelope.event_type.as_str(), DeliveryStatus::Success);
        return PushAck::new(DeliveryStatus::Success);
    }

    let result = reaction.react(&envelope).await;
    if let Err(e) = &result {
        if e.is_transient() {
            warn!(
                service,
                event_id = %envelope.id,
                kind = e.kind(),
                "事件处理瞬时失败，等待重投: {e}"
            );
        } else {
            error!(
                service,
                event_id = %envelope.id,
                kind = e.kind(),
                "事件处理失败，消息将被丢弃: {e}"
            );
        }
    }

    let status = DeliveryStatus::from_result(&result);

    // 未提交的预留必须释放，失败事件才保持可重投
    if reservation == Reservation::Fresh && !status.commits_dedup() {
        cache.release(&envelope.id);
    }

    if status.commits_dedup() {
        info!(service, event_id = %envelope.id, status = status.as_str(), "事件处理完成");
    }

    record_outcome(service, envelope.event_type.as_str(), status);
    PushAck::new(status)
}

fn record_outcome(service: &'static str, event_type: &str, status: DeliveryStatus) {
    counter!(
        EVENTS_PROCESSED,
        "service" => service,
        "event_type" => event_type.to_string(),
        "status" => status.as_str(),
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskevents_core::{ConsumerError, ConsumerResult, IdempotencyConfig};
    use taskevents_domain::{EventType, Outcome};

    /// 记录调用次数、按脚本返回结果的测试处理器
    struct ScriptedReaction {
        calls: AtomicUsize,
        fail_with: Option<fn() -> ConsumerError>,
        only_task_completed: bool,
    }

    impl ScriptedReaction {
        fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
                only_task_completed: false,
            }
        }

        fn failing(factory: fn() -> ConsumerError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: Some(factory),
                only_task_completed: false,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventReaction for ScriptedReaction {
        fn service_name(&self) -> &'static str {
            "test"
        }

        fn accepts(&self, event_type: &EventType) -> bool {
            !self.only_task_completed || *event_type == EventType::TaskCompleted
        }

        async fn react(&self, _envelope: &EventEnvelope) -> ConsumerResult<Outcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(factory) => Err(factory()),
                None => Ok(Outcome::Handled),
            }
        }
    }

    fn cache() -> IdempotencyCache {
        IdempotencyCache::new(&IdempotencyConfig {
            ttl_seconds: 3600,
            max_entries: 100,
        })
    }

    fn envelope_bytes(id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "specversion": "1.0",
            "type": "task.completed",
            "source": "backend",
            "id": id,
            "data": {"task_id": "t-1", "user_id": "u-1"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_path() {
        let cache = cache();
        let reaction = ScriptedReaction::succeeding();
        let ack = consume_push(&cache, &reaction, &envelope_bytes("evt-1")).await;
        assert_eq!(ack.status, DeliveryStatus::Success);
        assert_eq!(reaction.call_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_returns_success_without_rerunning_handler() {
        let cache = cache();
        let reaction = ScriptedReaction::succeeding();
        let body = envelope_bytes("evt-1");

        let first = consume_push(&cache, &reaction, &body).await;
        let second = consume_push(&cache, &reaction, &body).await;

        assert_eq!(first.status, DeliveryStatus::Success);
        assert_eq!(second.status, DeliveryStatus::Success);
        // 副作用只执行一次
        assert_eq!(reaction.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_maps_to_retry_and_stays_retryable() {
        let cache = cache();
        let reaction =
            ScriptedReaction::failing(|| ConsumerError::Downstream("store down".to_string()));
        let body = envelope_bytes("evt-1");

        let first = consume_push(&cache, &reaction, &body).await;
        assert_eq!(first.status, DeliveryStatus::Retry);
        // 失败不提交去重条目，重投会再次执行处理器
        let second = consume_push(&cache, &reaction, &body).await;
        assert_eq!(second.status, DeliveryStatus::Retry);
        assert_eq!(reaction.call_count(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_maps_to_drop() {
        let cache = cache();
        let reaction =
            ScriptedReaction::failing(|| ConsumerError::Validation("missing user_id".to_string()));
        let ack = consume_push(&cache, &reaction, &envelope_bytes("evt-1")).await;
        assert_eq!(ack.status, DeliveryStatus::Drop);
        assert!(!cache.is_processed("evt-1"));
    }

    #[tokio::test]
    async fn test_malformed_body_answers_drop() {
        let cache = cache();
        let reaction = ScriptedReaction::succeeding();
        let ack = consume_push(&cache, &reaction, b"not json at all").await;
        assert_eq!(ack.status, DeliveryStatus::Drop);
        assert_eq!(reaction.call_count(), 0);
    }

    #[tokio::test]
    async fn test_type_filter_answers_ignored_before_dedup() {
        let cache = cache();
        let reaction = ScriptedReaction {
            calls: AtomicUsize::new(0),
            fail_with: None,
            only_task_completed: true,
        };

        let body = serde_json::to_vec(&json!({
            "specversion": "1.0",
            "type": "task.created",
            "source": "backend",
            "id": "evt-9",
            "data": {}
        }))
        .unwrap();

        let ack = consume_push(&cache, &reaction, &body).await;
        assert_eq!(ack.status, DeliveryStatus::Ignored);
        assert_eq!(reaction.call_count(), 0);
        // 被忽略的事件不参与去重
        assert!(!cache.is_processed("evt-9"));
    }

    #[tokio::test]
    async fn test_empty_event_id_disables_dedup_but_still_handles() {
        let cache = cache();
        let reaction = ScriptedReaction::succeeding();
        let body = serde_json::to_vec(&json!({
            "specversion": "1.0",
            "type": "task.completed",
            "source": "backend",
            "id": "",
            "data": {}
        }))
        .unwrap();

        let first = consume_push(&cache, &reaction, &body).await;
        let second = consume_push(&cache, &reaction, &body).await;

        assert_eq!(first.status, DeliveryStatus::Success);
        assert_eq!(second.status, DeliveryStatus::Success);
        // 没有去重键，两次都会执行
        assert_eq!(reaction.call_count(), 2);
        assert_eq!(cache.processed_count(), 0);
    }
}
