use serde::{Deserialize, Serialize};

use taskevents_core::ConsumerResult;

/// 推送响应状态码
///
/// 代理根据响应体里的状态码决定消息去向，HTTP状态始终为200，
/// 避免在显式重投协议之上叠加传输层重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// 事件视为已投递（处理成功或识别为重复）
    #[serde(rename = "SUCCESS")]
    Success,
    /// 瞬时失败，要求代理稍后重投
    #[serde(rename = "RETRY")]
    Retry,
    /// 永久失败，代理不得重投，失败已记录待排查
    #[serde(rename = "DROP")]
    Drop,
    /// 事件类型不在本服务职责范围内
    #[serde(rename = "IGNORED")]
    Ignored,
    /// 处理完成但没有需要生成的下一次任务
    #[serde(rename = "NO_RECURRENCE")]
    NoRecurrence,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "SUCCESS",
            DeliveryStatus::Retry => "RETRY",
            DeliveryStatus::Drop => "DROP",
            DeliveryStatus::Ignored => "IGNORED",
            DeliveryStatus::NoRecurrence => "NO_RECURRENCE",
        }
    }

    /// 状态映射策略的唯一入口
    ///
    /// 错误按类别映射而不是按捕获位置：瞬时错误重投，
    /// 格式/校验/永久错误丢弃。
    pub fn from_result(result: &ConsumerResult<Outcome>) -> Self {
        match result {
            Ok(Outcome::Handled) => DeliveryStatus::Success,
            Ok(Outcome::NoRecurrence) => DeliveryStatus::NoRecurrence,
            Err(e) if e.is_transient() => DeliveryStatus::Retry,
            Err(_) => DeliveryStatus::Drop,
        }
    }

    /// 该状态是否应提交去重条目
    pub fn commits_dedup(&self) -> bool {
        matches!(self, DeliveryStatus::Success | DeliveryStatus::NoRecurrence)
    }
}

/// 处理器执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 副作用已执行
    Handled,
    /// 仅recurring服务：确认无需生成下一次任务
    NoRecurrence,
}

/// 推送响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushAck {
    pub status: DeliveryStatus,
}

impl PushAck {
    pub fn new(status: DeliveryStatus) -> Self {
        Self { status }
    }
}
