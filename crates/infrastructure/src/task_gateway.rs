use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{info, warn};

use taskevents_core::{ConsumerError, ConsumerResult, UpstreamConfig};
use taskevents_domain::{OccurrenceSink, ReminderDeliveryStatus, TaskGateway, TaskOccurrence};

/// 上游任务API的HTTP客户端
pub struct HttpTaskGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskGateway {
    pub fn new(config: &UpstreamConfig) -> ConsumerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConsumerError::Configuration(format!("构建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    async fn fetch_task_title(
        &self,
        task_id: &str,
        user_id: &str,
    ) -> ConsumerResult<Option<String>> {
        let url = format!("{}/api/tasks/{}", self.base_url, task_id);
        let response = self
            .client
            .get(&url)
            .header("X-User-ID", user_id)
            .send()
            .await
            .map_err(|e| ConsumerError::Network(format!("查询任务失败: {e}")))?;

        match response.status() {
            status if status.is_success() => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| ConsumerError::Downstream(format!("任务响应不是合法JSON: {e}")))?;
                Ok(body.get("title").and_then(Value::as_str).map(String::from))
            }
            StatusCode::NOT_FOUND => {
                warn!(task_id, "任务不存在");
                Ok(None)
            }
            status => Err(ConsumerError::Downstream(format!(
                "上游任务API返回 {status}"
            ))),
        }
    }

    async fn update_reminder_status(
        &self,
        reminder_id: &str,
        status: ReminderDeliveryStatus,
    ) -> ConsumerResult<bool> {
        let url = format!("{}/api/reminders/{}/status", self.base_url, reminder_id);
        let response = self
            .client
            .patch(&url)
            .json(&serde_json::json!({"status": status.as_str()}))
            .send()
            .await
            .map_err(|e| ConsumerError::Network(format!("回写提醒状态失败: {e}")))?;

        if response.status().is_success() {
            info!(reminder_id, status = status.as_str(), "提醒状态已更新");
            Ok(true)
        } else {
            warn!(
                reminder_id,
                code = %response.status(),
                "提醒状态更新被拒绝"
            );
            Ok(false)
        }
    }
}

/// 通过上游任务API落库下一次任务实例
pub struct HttpOccurrenceSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOccurrenceSink {
    pub fn new(config: &UpstreamConfig) -> ConsumerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConsumerError::Configuration(format!("构建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OccurrenceSink for HttpOccurrenceSink {
    async fn persist(&self, occurrence: &TaskOccurrence) -> ConsumerResult<()> {
        let url = format!("{}/api/tasks", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-User-ID", &occurrence.user_id)
            .json(occurrence)
            .send()
            .await
            .map_err(|e| ConsumerError::Network(format!("创建下一次任务失败: {e}")))?;

        if response.status().is_success() {
            info!(
                new_task_id = %occurrence.id,
                parent_task_id = %occurrence.parent_task_id,
                "下一次任务已创建"
            );
            Ok(())
        } else {
            Err(ConsumerError::Downstream(format!(
                "创建任务返回 {}",
                response.status()
            )))
        }
    }
}
