use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use taskevents_core::{ConsumerError, ConsumerResult};
use taskevents_domain::{
    EventEnvelope, EventReaction, EventType, NotificationChannel, NotificationRequest,
    NotificationSender, Outcome, ReminderDeliveryStatus, TaskGateway,
};

/// 通知事件处理器
///
/// 提醒事件触发通知投递，任务事件只在高优先级时转为通知。
pub struct NotificationReaction {
    sender: Arc<dyn NotificationSender>,
    gateway: Arc<dyn TaskGateway>,
}

impl NotificationReaction {
    pub fn new(sender: Arc<dyn NotificationSender>, gateway: Arc<dyn TaskGateway>) -> Self {
        Self { sender, gateway }
    }

    /// 处理调度器触发的到期提醒
    ///
    /// 标识先于一切可失败操作提取：无论失败发生在查询标题还是
    /// 投递通知，补偿步骤都拿得到提醒ID。
    async fn handle_reminder_due(&self, envelope: &EventEnvelope) -> ConsumerResult<Outcome> {
        let reminder_id = required_field(envelope, "reminder_id")?.to_string();
        let task_id = required_field(envelope, "task_id")?.to_string();
        let user_id = required_field(envelope, "user_id")?.to_string();

        info!(
            reminder_id = %reminder_id,
            task_id = %task_id,
            user_id = %user_id,
            "处理到期提醒"
        );

        match self
            .deliver_due_reminder(&reminder_id, &task_id, &user_id)
            .await
        {
            Ok(()) => {
                if let Err(e) = self
                    .gateway
                    .update_reminder_status(&reminder_id, ReminderDeliveryStatus::Sent)
                    .await
                {
                    // 状态回写失败不撤销已投递的通知
                    warn!(reminder_id = %reminder_id, "提醒状态回写失败: {e}");
                }
                Ok(Outcome::Handled)
            }
            Err(e) => {
                if let Err(patch_err) = self
                    .gateway
                    .update_reminder_status(&reminder_id, ReminderDeliveryStatus::Failed)
                    .await
                {
                    warn!(reminder_id = %reminder_id, "标记提醒失败时出错: {patch_err}");
                }
                Err(e)
            }
        }
    }

    async fn deliver_due_reminder(
        &self,
        reminder_id: &str,
        task_id: &str,
        user_id: &str,
    ) -> ConsumerResult<()> {
        let task_title = self.gateway.fetch_task_title(task_id, user_id).await?;
        let message = format!(
            "Reminder: {} is due soon!",
            task_title.as_deref().unwrap_or("Task")
        );

        let request =
            NotificationRequest::new(NotificationChannel::InApp, user_id, "Task Reminder", message)
                .with_metadata("reminder_id", reminder_id)
                .with_metadata("task_id", task_id)
                .with_metadata("trigger", "scheduled_job");

        if self.sender.send(&request).await? {
            Ok(())
        } else {
            Err(ConsumerError::Downstream("通知投递被拒绝".to_string()))
        }
    }

    /// 处理普通提醒事件，通知内容来自载荷字段
    async fn handle_reminder(&self, envelope: &EventEnvelope) -> ConsumerResult<Outcome> {
        let reminder_id = required_field(envelope, "reminder_id")?;
        let task_id = required_field(envelope, "task_id")?;
        let user_id = required_field(envelope, "user_id")?;

        let task_title = envelope.payload_str("task_title").unwrap_or("Task reminder");
        let mut message = format!("Reminder: {task_title}");
        if let Some(remind_at) = envelope.payload_str("remind_at") {
            message.push_str(&format!(" (scheduled for {remind_at})"));
        }

        let request =
            NotificationRequest::new(NotificationChannel::InApp, user_id, "Task Reminder", message)
                .with_metadata("reminder_id", reminder_id)
                .with_metadata("task_id", task_id);

        if self.sender.send(&request).await? {
            info!(reminder_id, task_id, user_id, "提醒通知已投递");
            Ok(Outcome::Handled)
        } else {
            warn!(reminder_id, "提醒通知投递被拒绝");
            Err(ConsumerError::Downstream("通知投递被拒绝".to_string()))
        }
    }

    /// 处理任务事件，只有高优先级任务才产生通知
    async fn handle_task(
        &self,
        envelope: &EventEnvelope,
        event_type: &EventType,
    ) -> ConsumerResult<Outcome> {
        let priority = envelope.payload_str("priority").unwrap_or("medium");
        if priority != "high" {
            debug!(event_type = %event_type, "非高优先级任务，不产生通知");
            return Ok(Outcome::Handled);
        }

        let title = envelope.payload_str("title").unwrap_or_default();
        let (subject, message) = match event_type {
            EventType::TaskCompleted => ("Task Completed", format!("You completed: {title}")),
            EventType::TaskCreated => (
                "New High-Priority Task",
                format!("New task created: {title}"),
            ),
            // 其他任务事件类型接受但不产生通知
            _ => return Ok(Outcome::Handled),
        };

        let user_id = required_field(envelope, "user_id")?;
        let task_id = envelope.payload_str("task_id").unwrap_or_default();

        let request =
            NotificationRequest::new(NotificationChannel::InApp, user_id, subject, message)
                .with_metadata("task_id", task_id)
                .with_metadata("event_type", envelope.event_type.as_str());

        if self.sender.send(&request).await? {
            Ok(Outcome::Handled)
        } else {
            Err(ConsumerError::Downstream("通知投递被拒绝".to_string()))
        }
    }
}

#[async_trait]
impl EventReaction for NotificationReaction {
    fn service_name(&self) -> &'static str {
        "notification"
    }

    async fn react(&self, envelope: &EventEnvelope) -> ConsumerResult<Outcome> {
        let event_type = envelope.kind();
        match &event_type {
            EventType::ReminderDue => self.handle_reminder_due(envelope).await,
            t if t.is_reminder_event() => self.handle_reminder(envelope).await,
            t if t.is_task_event() => self.handle_task(envelope, t).await,
            _ => {
                debug!(event_type = %event_type, "事件与通知无关，视为成功");
                Ok(Outcome::Handled)
            }
        }
    }
}

fn required_field<'a>(envelope: &'a EventEnvelope, key: &str) -> ConsumerResult<&'a str> {
    envelope
        .payload_str(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConsumerError::Validation(format!("事件载荷缺少{key}")))
}
