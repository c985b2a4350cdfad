use thiserror::Error;

/// 消费者错误类型定义
///
/// 错误分类决定推送响应的状态码：瞬时错误（下游、网络、数据库）
/// 要求代理重投，其余错误一律丢弃。
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("信封格式错误: {0}")]
    Malformed(String),

    #[error("事件数据校验失败: {0}")]
    Validation(String),

    #[error("下游服务错误: {0}")]
    Downstream(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ConsumerError {
    /// 瞬时错误在重投后可能成功，非瞬时错误重投也无法恢复
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConsumerError::Downstream(_) | ConsumerError::Network(_) | ConsumerError::Database(_)
        )
    }

    /// 错误类别标签，用于日志和指标
    pub fn kind(&self) -> &'static str {
        match self {
            ConsumerError::Malformed(_) => "malformed",
            ConsumerError::Validation(_) => "validation",
            ConsumerError::Downstream(_) => "downstream",
            ConsumerError::Network(_) => "network",
            ConsumerError::Database(_) => "database",
            ConsumerError::Serialization(_) => "serialization",
            ConsumerError::Configuration(_) => "configuration",
            ConsumerError::Internal(_) => "internal",
        }
    }
}
