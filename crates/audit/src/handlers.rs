use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use tracing::{info, warn};

use taskevents_domain::{
    AuditAction, AuditRecord, AuditStore, ConsumerResult, EventEnvelope, EventReaction, Outcome,
    PLACEHOLDER_USER_ID,
};
use taskevents_infrastructure::metrics::AUDIT_RECORDS_CREATED;

/// 审计事件处理器
///
/// 每个事件都写一条审计记录，未识别的类型记为unknown动作。
/// 审计完整性优先：载荷缺少user_id时用占位ID补齐而不是拒绝。
pub struct AuditReaction {
    store: Arc<dyn AuditStore>,
}

impl AuditReaction {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventReaction for AuditReaction {
    fn service_name(&self) -> &'static str {
        "audit"
    }

    async fn react(&self, envelope: &EventEnvelope) -> ConsumerResult<Outcome> {
        let event_type = envelope.kind();
        let action = AuditAction::from_event_type(&event_type);
        let entity_type = event_type.entity_type();

        let user_id = match envelope.payload_str("user_id").filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                warn!(
                    event_id = %envelope.id,
                    event_type = %event_type,
                    "事件缺少user_id，使用占位用户ID"
                );
                PLACEHOLDER_USER_ID.to_string()
            }
        };

        let entity_id = envelope
            .payload_str("task_id")
            .or_else(|| envelope.payload_str("reminder_id"))
            .unwrap_or(&envelope.id)
            .to_string();

        // 细节 = 事件标识 + 完整载荷
        let mut details = match &envelope.data {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("payload".to_string(), other.clone());
                map
            }
        };
        details.insert("event_id".to_string(), Value::String(envelope.id.clone()));
        details.insert(
            "event_type".to_string(),
            Value::String(envelope.event_type.clone()),
        );

        let record = AuditRecord::new(
            user_id,
            action,
            entity_type,
            entity_id,
            Some(Value::Object(details).to_string()),
        );
        self.store.append(&record).await?;

        counter!(
            AUDIT_RECORDS_CREATED,
            "action" => action.as_str(),
            "entity_type" => entity_type.as_str(),
        )
        .increment(1);

        info!(
            event_id = %envelope.id,
            action = action.as_str(),
            entity_id = %record.entity_id,
            "审计记录已入库"
        );
        Ok(Outcome::Handled)
    }
}
