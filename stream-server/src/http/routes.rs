use super::handlers::{self, AppState};
use crate::overlay::OverlayManager;
use crate::stream::StreamManager;
use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn create_router(
    stream_manager: StreamManager,
    overlay_manager: OverlayManager,
    cors_origins: &[String],
) -> Router {
    let state: AppState = (stream_manager, overlay_manager);

    Router::new()
        .route("/api/health", get(handlers::health_check))

        // 流控制
        .route("/api/streams", get(handlers::list_streams))
        .route("/api/streams/start", post(handlers::start_stream))
        .route("/api/streams/pause/:stream_id", post(handlers::pause_stream))
        .route("/api/streams/resume/:stream_id", post(handlers::resume_stream))
        .route("/api/streams/stop/:stream_id", post(handlers::stop_stream))
        .route("/api/streams/status/:stream_id", get(handlers::stream_status))

        // HLS 文件
        .route("/streams/:stream_id/*filename", get(handlers::serve_segment))

        // 叠加层
        .route(
            "/api/overlays",
            get(handlers::list_overlays).post(handlers::create_overlay),
        )
        .route(
            "/api/overlays/:overlay_id",
            put(handlers::update_overlay).delete(handlers::delete_overlay),
        )

        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// 空列表表示允许任意来源
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
