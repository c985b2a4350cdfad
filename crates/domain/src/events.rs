use std::fmt;

use serde::{Deserialize, Serialize};

/// 任务生命周期事件类型
///
/// 封闭枚举分发：未识别的类型落入 `Unknown` 分支而不是被拒绝。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    TaskCreated,
    TaskUpdated,
    TaskCompleted,
    TaskDeleted,
    TaskRecurred,
    ReminderScheduled,
    ReminderSent,
    ReminderCancelled,
    ReminderDue,
    Unknown(String),
}

impl EventType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "task.created" => EventType::TaskCreated,
            "task.updated" => EventType::TaskUpdated,
            "task.completed" => EventType::TaskCompleted,
            "task.deleted" => EventType::TaskDeleted,
            "task.recurred" => EventType::TaskRecurred,
            "reminder.scheduled" => EventType::ReminderScheduled,
            "reminder.sent" => EventType::ReminderSent,
            "reminder.cancelled" => EventType::ReminderCancelled,
            "reminder.due" => EventType::ReminderDue,
            other => EventType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::TaskCreated => "task.created",
            EventType::TaskUpdated => "task.updated",
            EventType::TaskCompleted => "task.completed",
            EventType::TaskDeleted => "task.deleted",
            EventType::TaskRecurred => "task.recurred",
            EventType::ReminderScheduled => "reminder.scheduled",
            EventType::ReminderSent => "reminder.sent",
            EventType::ReminderCancelled => "reminder.cancelled",
            EventType::ReminderDue => "reminder.due",
            EventType::Unknown(raw) => raw,
        }
    }

    /// 按类型前缀推导实体类型，未识别的类型也按前缀归类
    pub fn entity_type(&self) -> EntityType {
        let raw = self.as_str();
        if raw.starts_with("task.") {
            EntityType::Task
        } else if raw.starts_with("reminder.") {
            EntityType::Reminder
        } else {
            EntityType::Unknown
        }
    }

    pub fn is_task_event(&self) -> bool {
        matches!(self.entity_type(), EntityType::Task)
    }

    pub fn is_reminder_event(&self) -> bool {
        matches!(self.entity_type(), EntityType::Reminder)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 事件涉及的实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "task")]
    Task,
    #[serde(rename = "reminder")]
    Reminder,
    #[serde(rename = "unknown")]
    Unknown,
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "task" => EntityType::Task,
            "reminder" => EntityType::Reminder,
            _ => EntityType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Task => "task",
            EntityType::Reminder => "reminder",
            EntityType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
