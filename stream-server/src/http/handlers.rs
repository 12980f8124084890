use super::error::ApiError;
use crate::overlay::OverlayManager;
use crate::stream::StreamManager;
use axum::{
    extract::{Path, Query, Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use common::{
    ApiResponse, DeletedResponse, HealthResponse, Overlay, PausedResponse, ResumedResponse,
    StartStreamRequest, StoppedResponse, StreamCreated, StreamError, StreamReadiness,
    StreamSummary,
};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceExt;
use tower_http::services::ServeDir;

pub type AppState = (StreamManager, OverlayManager);

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// 健康检查
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "up".to_string(),
    }))
}

// ========== 流控制 ==========

/// 创建流（请求体解析失败按空请求处理）
pub async fn start_stream(
    State((stream_manager, _)): State<AppState>,
    payload: Option<Json<StartStreamRequest>>,
) -> ApiResult<StreamCreated> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let source_url = req.source_url.unwrap_or_default();
    tracing::info!("📹 Start stream request for {}", source_url);

    let created = stream_manager.create(&source_url).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// 暂停流
pub async fn pause_stream(
    Path(stream_id): Path<String>,
    State((stream_manager, _)): State<AppState>,
) -> ApiResult<PausedResponse> {
    stream_manager.pause(&stream_id).await?;
    Ok(Json(ApiResponse::success(PausedResponse { paused: stream_id })))
}

/// 恢复流
pub async fn resume_stream(
    Path(stream_id): Path<String>,
    State((stream_manager, _)): State<AppState>,
) -> ApiResult<ResumedResponse> {
    stream_manager.resume(&stream_id).await?;
    Ok(Json(ApiResponse::success(ResumedResponse { resumed: stream_id })))
}

/// 停止流
pub async fn stop_stream(
    Path(stream_id): Path<String>,
    State((stream_manager, _)): State<AppState>,
) -> ApiResult<StoppedResponse> {
    stream_manager.stop(&stream_id).await?;
    Ok(Json(ApiResponse::success(StoppedResponse { stopped: stream_id })))
}

/// 获取流列表
pub async fn list_streams(
    State((stream_manager, _)): State<AppState>,
) -> ApiResult<Vec<StreamSummary>> {
    Ok(Json(ApiResponse::success(stream_manager.list().await?)))
}

/// 流就绪状态（未知 id 返回 ready=false）
pub async fn stream_status(
    Path(stream_id): Path<String>,
    State((stream_manager, _)): State<AppState>,
) -> ApiResult<StreamReadiness> {
    Ok(Json(ApiResponse::success(stream_manager.status(&stream_id).await?)))
}

/// HLS 播放列表与分片
pub async fn serve_segment(
    Path((stream_id, filename)): Path<(String, String)>,
    State((stream_manager, _)): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let not_found = || ApiError(StreamError::NotFound("stream not found".to_string()));

    let dir = stream_manager
        .segment_dir(&stream_id)
        .await?
        .ok_or_else(not_found)?;

    let uri: Uri = format!("/{}", filename.trim_start_matches('/'))
        .parse()
        .map_err(|_| not_found())?;
    let (mut parts, body) = request.into_parts();
    parts.uri = uri;

    let response = match ServeDir::new(dir).oneshot(Request::from_parts(parts, body)).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        return Err(ApiError(StreamError::NotFound("file not found".to_string())));
    }
    Ok(response.into_response())
}

// ========== 叠加层 ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayQuery {
    stream_id: Option<String>,
}

/// 获取叠加层列表
pub async fn list_overlays(
    Query(query): Query<OverlayQuery>,
    State((_, overlay_manager)): State<AppState>,
) -> Json<ApiResponse<Vec<Overlay>>> {
    let overlays = overlay_manager.list(query.stream_id.as_deref()).await;
    Json(ApiResponse::success(overlays))
}

/// 创建叠加层
pub async fn create_overlay(
    State((_, overlay_manager)): State<AppState>,
    payload: Option<Json<Value>>,
) -> Result<(StatusCode, Json<ApiResponse<Overlay>>), ApiError> {
    let body = payload.map(|Json(body)| body).unwrap_or(Value::Null);
    let overlay = overlay_manager.create(body).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(overlay))))
}

/// 更新叠加层
pub async fn update_overlay(
    Path(overlay_id): Path<String>,
    State((_, overlay_manager)): State<AppState>,
    payload: Option<Json<Value>>,
) -> ApiResult<Overlay> {
    let patch = payload
        .map(|Json(body)| body)
        .unwrap_or_else(|| Value::Object(Default::default()));
    let overlay = overlay_manager.update(&overlay_id, patch).await?;
    Ok(Json(ApiResponse::success(overlay)))
}

/// 删除叠加层
pub async fn delete_overlay(
    Path(overlay_id): Path<String>,
    State((_, overlay_manager)): State<AppState>,
) -> ApiResult<DeletedResponse> {
    overlay_manager.delete(&overlay_id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { deleted: true })))
}
