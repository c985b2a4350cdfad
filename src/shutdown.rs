use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// 优雅关闭管理器
///
/// 把进程信号转成广播，每个HTTP监听各自订阅。
pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self { shutdown_tx }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// 监听进程信号，收到Ctrl+C或SIGTERM时触发关闭
    pub fn listen_for_signals(&self) {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    error!("注册Ctrl+C监听失败: {e}");
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        error!("注册SIGTERM监听失败: {e}");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => info!("收到Ctrl+C信号"),
                _ = terminate => info!("收到终止信号"),
            }

            info!("触发系统关闭");
            let _ = shutdown_tx.send(());
        });
    }
}
