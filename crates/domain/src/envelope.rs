use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::EventType;

/// 字段缺失时的占位值
pub const UNKNOWN_FIELD: &str = "unknown";

fn default_specversion() -> String {
    "1.0".to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_data() -> Value {
    Value::Object(serde_json::Map::new())
}

/// CloudEvents 1.0 事件信封
///
/// 代理推送的消息体。解析永远不会失败：非标准消息退化为
/// 从顶层键读取 `id`/`type`/`data`，缺失字段用占位值填充，
/// 保证畸形消息也能产生一个控制重投的响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default = "default_specversion")]
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub id: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default = "default_content_type")]
    pub datacontenttype: String,
    #[serde(default = "default_data")]
    pub data: Value,
}

impl EventEnvelope {
    /// 解析代理推送的原始消息体
    pub fn parse(raw: Value) -> Self {
        match serde_json::from_value::<EventEnvelope>(raw.clone()) {
            Ok(envelope) => envelope,
            Err(_) => Self::from_loose(raw),
        }
    }

    /// 从松散的顶层键还原信封
    fn from_loose(raw: Value) -> Self {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_FIELD)
            .to_string();
        let event_type = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_FIELD)
            .to_string();
        let source = raw
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let time = raw
            .get("time")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        // 没有data字段时整个消息体就是载荷
        let data = raw.get("data").cloned().unwrap_or(raw);

        Self {
            specversion: default_specversion(),
            event_type,
            source,
            id,
            time,
            datacontenttype: default_content_type(),
            data,
        }
    }

    /// 事件类型的封闭枚举表示
    pub fn kind(&self) -> EventType {
        EventType::parse(&self.event_type)
    }

    /// 是否携带可用于去重的事件ID
    pub fn has_dedup_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// 读取载荷中的字符串字段
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// 读取载荷中的整数字段
    pub fn payload_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }
}
