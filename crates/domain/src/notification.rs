use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 通知投递渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Push,
    InApp,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Push => "push",
            NotificationChannel::InApp => "in_app",
        }
    }
}

/// 通知请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channel: NotificationChannel,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl NotificationRequest {
    pub fn new(
        channel: NotificationChannel,
        user_id: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            user_id: user_id.into(),
            subject: subject.into(),
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 单渠道投递结果
#[derive(Debug, Clone)]
pub struct NotificationResult {
    pub success: bool,
    pub channel: NotificationChannel,
    pub error: Option<String>,
}

/// 提醒投递状态，回写给上游任务API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderDeliveryStatus {
    Sent,
    Failed,
}

impl ReminderDeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderDeliveryStatus::Sent => "sent",
            ReminderDeliveryStatus::Failed => "failed",
        }
    }
}
