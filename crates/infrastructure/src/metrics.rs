use std::net::{Ipv4Addr, SocketAddr};

use ::metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use taskevents_core::{ConsumerError, ConsumerResult};

/// 事件处理结果计数，标签: service / event_type / status
pub const EVENTS_PROCESSED: &str = "events_processed_total";
/// 审计记录写入计数，标签: action / entity_type
pub const AUDIT_RECORDS_CREATED: &str = "audit_records_created_total";
/// 通知投递计数，标签: channel / outcome
pub const NOTIFICATIONS_SENT: &str = "notifications_sent_total";
/// 下一次任务生成计数
pub const OCCURRENCES_GENERATED: &str = "occurrences_generated_total";

/// 安装Prometheus指标导出器
///
/// 在独立端口上暴露抓取端点，必须在Tokio运行时内调用。
pub fn install_prometheus_exporter(port: u16) -> ConsumerResult<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ConsumerError::Configuration(format!("安装指标导出器失败: {e}")))?;

    describe_counter!(EVENTS_PROCESSED, Unit::Count, "处理的推送事件总数");
    describe_counter!(AUDIT_RECORDS_CREATED, Unit::Count, "写入的审计记录总数");
    describe_counter!(NOTIFICATIONS_SENT, Unit::Count, "投递的通知总数");
    describe_counter!(OCCURRENCES_GENERATED, Unit::Count, "生成的下一次任务总数");

    info!("指标导出器已启动: {}", addr);
    Ok(())
}
