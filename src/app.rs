use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use taskevents_core::AppConfig;
use taskevents_infrastructure::{
    metrics::install_prometheus_exporter, HttpOccurrenceSink, HttpTaskGateway, IdempotencyCache,
    LogNotificationSender, PostgresAuditStore,
};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 仅运行审计服务
    Audit,
    /// 仅运行通知服务
    Notification,
    /// 仅运行重复任务服务
    Recurring,
    /// 运行所有服务
    All,
}

impl AppMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "audit" => Ok(AppMode::Audit),
            "notification" => Ok(AppMode::Notification),
            "recurring" => Ok(AppMode::Recurring),
            "all" => Ok(AppMode::All),
            other => bail!("未知的运行模式: {other}"),
        }
    }

    fn runs(&self, mode: AppMode) -> bool {
        *self == AppMode::All || *self == mode
    }
}

/// 主应用程序
///
/// 按运行模式装配各服务的协作方并启动对应的HTTP监听。
/// 每个服务持有自己的幂等缓存，与独立进程部署时的行为一致。
pub struct Application {
    config: AppConfig,
    mode: AppMode,
}

impl Application {
    pub fn new(config: AppConfig, mode: AppMode) -> Self {
        Self { config, mode }
    }

    /// 运行应用程序
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("初始化应用程序，模式: {:?}", self.mode);
        info!(
            "消息总线: {} (sidecar端口 {})",
            self.config.pubsub.name, self.config.pubsub.broker_port
        );

        if self.config.metrics.enabled {
            install_prometheus_exporter(self.config.metrics.port).context("启动指标导出器失败")?;
        }

        let mut servers: Vec<(&'static str, u16, Router)> = Vec::new();

        if self.mode.runs(AppMode::Audit) {
            servers.push((
                taskevents_audit::SERVICE_NAME,
                self.config.services.audit_port,
                self.build_audit_service().await?,
            ));
        }
        if self.mode.runs(AppMode::Notification) {
            servers.push((
                taskevents_notification::SERVICE_NAME,
                self.config.services.notification_port,
                self.build_notification_service()?,
            ));
        }
        if self.mode.runs(AppMode::Recurring) {
            servers.push((
                taskevents_recurring::SERVICE_NAME,
                self.config.services.recurring_port,
                self.build_recurring_service()?,
            ));
        }

        let mut handles = Vec::with_capacity(servers.len());
        for (name, port, router) in servers {
            let addr = format!("{}:{}", self.config.services.host, port);
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("绑定 {addr} 失败"))?;
            info!("{name} 监听于 {addr}");

            let mut rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                let result = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    error!("{name} 服务异常退出: {e}");
                }
                info!("{name} 已停止");
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn build_audit_service(&self) -> Result<Router> {
        let store = PostgresAuditStore::connect(
            &self.config.database.url,
            self.config.database.max_connections,
        )
        .await
        .context("连接审计数据库失败")?;
        store.ensure_schema().await.context("初始化审计表失败")?;

        let state = taskevents_audit::AppState {
            cache: Arc::new(IdempotencyCache::new(&self.config.idempotency)),
            reaction: Arc::new(taskevents_audit::AuditReaction::new(Arc::new(store))),
            pubsub_name: self.config.pubsub.name.clone(),
        };
        Ok(taskevents_audit::create_routes(state))
    }

    fn build_notification_service(&self) -> Result<Router> {
        let gateway = Arc::new(
            HttpTaskGateway::new(&self.config.upstream).context("创建任务API客户端失败")?,
        );
        let sender = Arc::new(LogNotificationSender);

        let state = taskevents_notification::AppState {
            cache: Arc::new(IdempotencyCache::new(&self.config.idempotency)),
            reaction: Arc::new(taskevents_notification::NotificationReaction::new(
                sender, gateway,
            )),
            pubsub_name: self.config.pubsub.name.clone(),
        };
        Ok(taskevents_notification::create_routes(state))
    }

    fn build_recurring_service(&self) -> Result<Router> {
        let sink = Arc::new(
            HttpOccurrenceSink::new(&self.config.upstream).context("创建任务API客户端失败")?,
        );

        let state = taskevents_recurring::AppState {
            cache: Arc::new(IdempotencyCache::new(&self.config.idempotency)),
            reaction: Arc::new(taskevents_recurring::RecurringTaskReaction::new(sink)),
            pubsub_name: self.config.pubsub.name.clone(),
        };
        Ok(taskevents_recurring::create_routes(state))
    }
}
