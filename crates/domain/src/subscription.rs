use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 任务事件主题
pub const TASK_EVENTS_TOPIC: &str = "task-events";
/// 提醒主题
pub const REMINDERS_TOPIC: &str = "reminders";

/// 订阅声明
///
/// 代理启动时调用发现端点获取各服务的订阅列表，
/// 字段名跟随代理的订阅协议。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSubscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TopicSubscription {
    /// 声明一个要求原始载荷投递的订阅
    pub fn raw_payload(pubsub_name: &str, topic: &str, route: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("rawPayload".to_string(), "true".to_string());

        Self {
            pubsubname: pubsub_name.to_string(),
            topic: topic.to_string(),
            route: route.to_string(),
            metadata,
        }
    }
}
