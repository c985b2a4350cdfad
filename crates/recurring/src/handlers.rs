use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use tracing::{debug, info};

use taskevents_domain::{
    CompletedTask, ConsumerResult, EventEnvelope, EventReaction, EventType, OccurrenceSink,
    Outcome, RecurrenceGenerator, RecurrenceType,
};
use taskevents_infrastructure::metrics::OCCURRENCES_GENERATED;

/// 重复任务事件处理器
///
/// 只响应task.completed：完成的任务带重复设置时生成下一次实例
/// 并交给持久化协作方。不重复或设置不合法都按"无需生成"处理，
/// 不算错误。
pub struct RecurringTaskReaction {
    generator: RecurrenceGenerator,
    sink: Arc<dyn OccurrenceSink>,
}

impl RecurringTaskReaction {
    pub fn new(sink: Arc<dyn OccurrenceSink>) -> Self {
        Self {
            generator: RecurrenceGenerator::default(),
            sink,
        }
    }

    pub fn with_generator(mut self, generator: RecurrenceGenerator) -> Self {
        self.generator = generator;
        self
    }
}

#[async_trait]
impl EventReaction for RecurringTaskReaction {
    fn service_name(&self) -> &'static str {
        "recurring-task"
    }

    fn accepts(&self, event_type: &EventType) -> bool {
        *event_type == EventType::TaskCompleted
    }

    async fn react(&self, envelope: &EventEnvelope) -> ConsumerResult<Outcome> {
        let task = CompletedTask::from_envelope(envelope)?;

        if task.recurrence_type == RecurrenceType::None {
            debug!(task_id = %task.task_id, "任务不重复，跳过");
            return Ok(Outcome::NoRecurrence);
        }

        let now = Utc::now();
        match self.generator.generate(now, &task) {
            Some(occurrence) => {
                self.sink.persist(&occurrence).await?;
                counter!(OCCURRENCES_GENERATED).increment(1);
                info!(
                    parent_task_id = %occurrence.parent_task_id,
                    new_task_id = %occurrence.id,
                    next_due_at = %occurrence.due_at,
                    recurrence_type = task.recurrence_type.as_str(),
                    "已生成下一次任务"
                );
                Ok(Outcome::Handled)
            }
            None => Ok(Outcome::NoRecurrence),
        }
    }
}
