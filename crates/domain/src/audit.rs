use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{EntityType, EventType};

/// 载荷缺少user_id时写入的占位用户ID
///
/// 审计完整性优先于严格校验：缺字段的事件也要留痕。
pub const PLACEHOLDER_USER_ID: &str = "00000000-0000-0000-0000-000000000000";

/// 审计动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "task.created")]
    TaskCreated,
    #[serde(rename = "task.updated")]
    TaskUpdated,
    #[serde(rename = "task.completed")]
    TaskCompleted,
    #[serde(rename = "task.deleted")]
    TaskDeleted,
    #[serde(rename = "task.recurred")]
    TaskRecurred,
    #[serde(rename = "reminder.scheduled")]
    ReminderScheduled,
    #[serde(rename = "reminder.sent")]
    ReminderSent,
    #[serde(rename = "reminder.cancelled")]
    ReminderCancelled,
    #[serde(rename = "unknown")]
    Unknown,
}

impl AuditAction {
    /// 事件类型到审计动作的映射，未识别的类型记为unknown但仍然入库
    pub fn from_event_type(event_type: &EventType) -> Self {
        match event_type {
            EventType::TaskCreated => AuditAction::TaskCreated,
            EventType::TaskUpdated => AuditAction::TaskUpdated,
            EventType::TaskCompleted => AuditAction::TaskCompleted,
            EventType::TaskDeleted => AuditAction::TaskDeleted,
            EventType::TaskRecurred => AuditAction::TaskRecurred,
            EventType::ReminderScheduled => AuditAction::ReminderScheduled,
            EventType::ReminderSent => AuditAction::ReminderSent,
            EventType::ReminderCancelled => AuditAction::ReminderCancelled,
            EventType::ReminderDue | EventType::Unknown(_) => AuditAction::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TaskCreated => "task.created",
            AuditAction::TaskUpdated => "task.updated",
            AuditAction::TaskCompleted => "task.completed",
            AuditAction::TaskDeleted => "task.deleted",
            AuditAction::TaskRecurred => "task.recurred",
            AuditAction::ReminderScheduled => "reminder.scheduled",
            AuditAction::ReminderSent => "reminder.sent",
            AuditAction::ReminderCancelled => "reminder.cancelled",
            AuditAction::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "task.created" => AuditAction::TaskCreated,
            "task.updated" => AuditAction::TaskUpdated,
            "task.completed" => AuditAction::TaskCompleted,
            "task.deleted" => AuditAction::TaskDeleted,
            "task.recurred" => AuditAction::TaskRecurred,
            "reminder.scheduled" => AuditAction::ReminderScheduled,
            "reminder.sent" => AuditAction::ReminderSent,
            "reminder.cancelled" => AuditAction::ReminderCancelled,
            _ => AuditAction::Unknown,
        }
    }
}

/// 审计记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub user_id: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    /// 事件载荷的JSON序列化文本
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        user_id: String,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: String,
        details: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action,
            entity_type,
            entity_id,
            details,
            created_at: Utc::now(),
        }
    }
}

/// 审计查询过滤条件
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            entity_type: None,
            entity_id: None,
            action: None,
            limit: 100,
        }
    }
}
