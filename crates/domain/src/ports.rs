//! 协作方抽象
//!
//! 定义消费者核心对外部系统的依赖接口，遵循依赖倒置原则

use async_trait::async_trait;

use crate::audit::{AuditFilter, AuditRecord};
use crate::envelope::EventEnvelope;
use crate::events::EventType;
use crate::notification::{NotificationRequest, ReminderDeliveryStatus};
use crate::recurrence::TaskOccurrence;
use crate::status::Outcome;
use taskevents_core::ConsumerResult;

/// 审计存储抽象
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> ConsumerResult<()>;
    async fn find_recent(&self, filter: &AuditFilter) -> ConsumerResult<Vec<AuditRecord>>;
}

/// 上游任务API抽象
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// 查询任务标题，任务不存在时返回None
    async fn fetch_task_title(&self, task_id: &str, user_id: &str)
        -> ConsumerResult<Option<String>>;

    /// 回写提醒投递状态，上游拒绝时返回false
    async fn update_reminder_status(
        &self,
        reminder_id: &str,
        status: ReminderDeliveryStatus,
    ) -> ConsumerResult<bool>;
}

/// 通知投递抽象，投递被拒绝时返回false
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> ConsumerResult<bool>;
}

/// 下一次任务实例的持久化抽象
#[async_trait]
pub trait OccurrenceSink: Send + Sync {
    async fn persist(&self, occurrence: &TaskOccurrence) -> ConsumerResult<()>;
}

/// 事件反应处理器
///
/// 每个服务实现一个：审计、通知、重复任务。
#[async_trait]
pub trait EventReaction: Send + Sync {
    /// 服务名称，用于日志与指标标签
    fn service_name(&self) -> &'static str;

    /// 分发前的硬过滤
    ///
    /// 返回false的事件直接回复IGNORED，不参与去重。
    fn accepts(&self, event_type: &EventType) -> bool {
        let _ = event_type;
        true
    }

    async fn react(&self, envelope: &EventEnvelope) -> ConsumerResult<Outcome>;
}
