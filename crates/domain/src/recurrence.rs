use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::envelope::EventEnvelope;
use taskevents_core::{ConsumerError, ConsumerResult};

/// 任务重复类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    None,
    Daily,
    Weekly,
    Custom,
}

impl RecurrenceType {
    /// 解析失败退化为None，未知的重复类型不产生下一次任务
    pub fn parse(raw: &str) -> Self {
        match raw {
            "none" => RecurrenceType::None,
            "daily" => RecurrenceType::Daily,
            "weekly" => RecurrenceType::Weekly,
            "custom" => RecurrenceType::Custom,
            _ => RecurrenceType::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::None => "none",
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Custom => "custom",
        }
    }
}

/// 已完成任务的重复描述，从task.completed事件载荷提取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub recurrence_type: RecurrenceType,
    pub recurrence_interval: Option<i64>,
    pub due_at: Option<String>,
    pub priority: String,
}

impl CompletedTask {
    /// 从事件载荷提取任务描述
    ///
    /// `task_id`/`user_id` 缺失是校验错误；`recurrence_type`
    /// 缺失或无法解析按不重复处理。
    pub fn from_envelope(envelope: &EventEnvelope) -> ConsumerResult<Self> {
        let task_id = envelope
            .payload_str("task_id")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConsumerError::Validation("事件载荷缺少task_id".to_string()))?
            .to_string();
        let user_id = envelope
            .payload_str("user_id")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConsumerError::Validation("事件载荷缺少user_id".to_string()))?
            .to_string();

        Ok(Self {
            task_id,
            user_id,
            title: envelope.payload_str("title").unwrap_or_default().to_string(),
            description: envelope
                .payload_str("description")
                .map(|s| s.to_string()),
            recurrence_type: envelope
                .payload_str("recurrence_type")
                .map(RecurrenceType::parse)
                .unwrap_or(RecurrenceType::None),
            recurrence_interval: envelope.payload_i64("recurrence_interval"),
            due_at: envelope.payload_str("due_at").map(|s| s.to_string()),
            priority: envelope
                .payload_str("priority")
                .unwrap_or("medium")
                .to_string(),
        })
    }
}

/// 生成的下一次任务
///
/// 交给外部持久化协作方的值对象，核心不负责落库。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOccurrence {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub recurrence_type: RecurrenceType,
    pub recurrence_interval: Option<i64>,
    pub due_at: DateTime<Utc>,
    pub next_occurrence_at: DateTime<Utc>,
    pub priority: String,
    pub parent_task_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 解析到期时间文本
///
/// 接受带Z后缀的RFC 3339，以及按UTC处理的裸日期时间。
pub fn parse_due_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}

/// 计算下一次到期时间
///
/// 基准时间早于当前时间时先推进到当前时间，下一次任务永远不会
/// 排在过去。到期时间文本无法解析时不猜测，直接放弃。
pub fn calculate_next_due_date(
    now: DateTime<Utc>,
    current_due_at: Option<&str>,
    recurrence_type: RecurrenceType,
    recurrence_interval: Option<i64>,
) -> Option<DateTime<Utc>> {
    if recurrence_type == RecurrenceType::None {
        return None;
    }

    let base = match current_due_at {
        Some(raw) => match parse_due_at(raw) {
            Some(dt) => dt,
            None => {
                error!("无法解析到期时间: {raw}");
                return None;
            }
        },
        None => now,
    };

    let base = if base < now { now } else { base };

    match recurrence_type {
        RecurrenceType::Daily => Some(base + Duration::days(1)),
        RecurrenceType::Weekly => Some(base + Duration::days(7)),
        RecurrenceType::Custom => match recurrence_interval {
            Some(days) if days > 0 => Some(base + Duration::days(days)),
            _ => {
                warn!("自定义重复缺少有效间隔: {:?}", recurrence_interval);
                None
            }
        },
        RecurrenceType::None => None,
    }
}

/// 生成重复任务的下一次实例
pub fn generate_next_occurrence(
    now: DateTime<Utc>,
    task: &CompletedTask,
) -> Option<TaskOccurrence> {
    if task.recurrence_type == RecurrenceType::None {
        return None;
    }

    let next_due = calculate_next_due_date(
        now,
        task.due_at.as_deref(),
        task.recurrence_type,
        task.recurrence_interval,
    )?;

    let occurrence = TaskOccurrence {
        id: Uuid::new_v4(),
        user_id: task.user_id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        is_completed: false,
        recurrence_type: task.recurrence_type,
        recurrence_interval: task.recurrence_interval,
        due_at: next_due,
        next_occurrence_at: next_due,
        priority: task.priority.clone(),
        parent_task_id: task.task_id.clone(),
        created_at: now,
        updated_at: now,
    };

    debug!(
        parent_task_id = %occurrence.parent_task_id,
        new_task_id = %occurrence.id,
        next_due_at = %occurrence.due_at,
        "生成下一次任务实例"
    );

    Some(occurrence)
}

/// 带策略校验的重复任务生成器
///
/// 校验必须先于生成：生成逻辑假定输入已经合法。
#[derive(Debug, Clone)]
pub struct RecurrenceGenerator {
    max_future_days: i64,
}

impl Default for RecurrenceGenerator {
    fn default() -> Self {
        Self::new(365)
    }
}

impl RecurrenceGenerator {
    pub fn new(max_future_days: i64) -> Self {
        Self { max_future_days }
    }

    /// 检查给定的重复设置能否生成下一次实例
    pub fn can_generate(
        &self,
        recurrence_type: RecurrenceType,
        recurrence_interval: Option<i64>,
    ) -> bool {
        match recurrence_type {
            RecurrenceType::None => false,
            RecurrenceType::Custom => match recurrence_interval {
                Some(days) => days > 0 && days <= self.max_future_days,
                None => false,
            },
            RecurrenceType::Daily | RecurrenceType::Weekly => true,
        }
    }

    /// 校验后生成下一次实例
    pub fn generate(&self, now: DateTime<Utc>, task: &CompletedTask) -> Option<TaskOccurrence> {
        if !self.can_generate(task.recurrence_type, task.recurrence_interval) {
            warn!(
                recurrence_type = task.recurrence_type.as_str(),
                recurrence_interval = ?task.recurrence_interval,
                "重复设置不合法，跳过生成"
            );
            return None;
        }

        generate_next_occurrence(now, task)
    }
}
