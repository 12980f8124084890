use crate::overlay::OverlayManager;
use crate::stream::StreamManager;
use common::Result;
use std::net::SocketAddr;
use tracing::info;

#[derive(Clone)]
pub struct HttpServer {
    addr: SocketAddr,
    stream_manager: StreamManager,
    overlay_manager: OverlayManager,
    cors_origins: Vec<String>,
}

impl HttpServer {
    pub fn new(
        addr: SocketAddr,
        stream_manager: StreamManager,
        overlay_manager: OverlayManager,
        cors_origins: Vec<String>,
    ) -> Self {
        Self {
            addr,
            stream_manager,
            overlay_manager,
            cors_origins,
        }
    }

    /// 运行直到收到 Ctrl+C / SIGTERM；转码进程保持运行，重启后继续通过存储管理
    pub async fn run(&self) -> Result<()> {
        info!("HTTP server running on {}", self.addr);

        let app = super::routes::create_router(
            self.stream_manager.clone(),
            self.overlay_manager.clone(),
            &self.cors_origins,
        );

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
