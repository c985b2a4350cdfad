use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ::metrics::counter;
use tracing::info;

use taskevents_domain::{
    ConsumerResult, NotificationChannel, NotificationRequest, NotificationResult,
    NotificationSender,
};

use crate::metrics::NOTIFICATIONS_SENT;

/// 开发环境的通知投递实现
///
/// 三个渠道都只打日志。生产渠道（SMTP、FCM/APNS、站内信落库）
/// 通过同一个trait接入。
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, request: &NotificationRequest) -> ConsumerResult<bool> {
        match request.channel {
            NotificationChannel::Email => {
                info!(
                    "[mock email] to=user_{}@example.com subject={} body={}",
                    request.user_id, request.subject, request.message
                );
            }
            NotificationChannel::Push => {
                info!(
                    "[mock push] to={} title={} body={}",
                    request.user_id, request.subject, request.message
                );
            }
            NotificationChannel::InApp => {
                info!(
                    "[mock in-app] to={} title={} body={} meta={:?}",
                    request.user_id, request.subject, request.message, request.metadata
                );
            }
        }

        counter!(
            NOTIFICATIONS_SENT,
            "channel" => request.channel.as_str(),
            "outcome" => "sent",
        )
        .increment(1);
        Ok(true)
    }
}

/// 多渠道通知服务
///
/// 在单渠道投递之上提供按渠道列表的扇出，返回每个渠道的结果。
pub struct NotificationService {
    sender: Arc<dyn NotificationSender>,
    default_channel: NotificationChannel,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            sender,
            default_channel: NotificationChannel::InApp,
        }
    }

    pub fn with_default_channel(mut self, channel: NotificationChannel) -> Self {
        self.default_channel = channel;
        self
    }

    /// 向用户投递通知
    ///
    /// 未指定渠道时使用默认渠道。单个渠道失败不影响其他渠道。
    pub async fn notify_user(
        &self,
        user_id: &str,
        subject: &str,
        message: &str,
        channels: Option<&[NotificationChannel]>,
        metadata: HashMap<String, String>,
    ) -> Vec<NotificationResult> {
        let default = [self.default_channel];
        let channels = channels.unwrap_or(&default);
        let mut results = Vec::with_capacity(channels.len());

        for channel in channels {
            let mut request =
                NotificationRequest::new(*channel, user_id, subject, message);
            request.metadata = metadata.clone();

            let result = match self.sender.send(&request).await {
                Ok(true) => NotificationResult {
                    success: true,
                    channel: *channel,
                    error: None,
                },
                Ok(false) => NotificationResult {
                    success: false,
                    channel: *channel,
                    error: Some("投递被拒绝".to_string()),
                },
                Err(e) => NotificationResult {
                    success: false,
                    channel: *channel,
                    error: Some(e.to_string()),
                },
            };
            results.push(result);
        }

        results
    }
}
