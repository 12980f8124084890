use anyhow::{Context, Result};
use std::sync::Arc;
use stream_server::config::Config;
use stream_server::http::HttpServer;
use stream_server::overlay::OverlayManager;
use stream_server::process::{platform_control, FfmpegTranscoder};
use stream_server::stream::{JsonStreamStore, StreamManager, StreamStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志 - 使用环境变量 RUST_LOG 控制级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("🚀 Stream server starting...");

    // 加载配置
    let config = Config::load()?;
    info!("✓ Configuration loaded");
    info!("  Streams dir: {:?}", config.streams_dir);
    info!("  Data dir: {:?}", config.data_dir);
    info!("  Transcoder: {:?}", config.ffmpeg_bin);

    tokio::fs::create_dir_all(&config.streams_dir)
        .await
        .with_context(|| format!("failed to create {:?}", config.streams_dir))?;

    // 持久化存储
    let stream_store = JsonStreamStore::open(config.streams_store_path()).await?;
    let restored = stream_store.list().await?;
    if !restored.is_empty() {
        info!("✓ {} stream record(s) restored from store", restored.len());
    }

    let stream_manager = StreamManager::new(
        config.streams_dir.clone(),
        Arc::new(stream_store),
        Arc::new(FfmpegTranscoder::new(config.ffmpeg_bin.clone())),
        platform_control(),
    );
    let overlay_manager = OverlayManager::open(config.overlays_store_path()).await?;

    info!("✓ Managers initialized");

    let addr: std::net::SocketAddr = format!("{}:{}", config.http_host, config.http_port)
        .parse()
        .context("invalid HTTP listen address")?;
    let server = HttpServer::new(addr, stream_manager, overlay_manager, config.cors_origins.clone());

    info!("✅ Stream server ready on {}", addr);

    server.run().await?;

    Ok(())
}
