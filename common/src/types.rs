use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 转码器写出的 HLS 播放列表文件名
pub const PLAYLIST_FILE: &str = "index.m3u8";

/// 流的相对播放地址
pub fn playback_url(stream_id: &str) -> String {
    format!("/streams/{}/{}", stream_id, PLAYLIST_FILE)
}

/// 流状态（停止的流没有记录，因此不存在 stopped）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Running,
    Paused,
}

/// 持久化的流记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub id: String,
    pub source_url: String,
    pub output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    pub status: StreamStatus,
    pub created_at: DateTime<Utc>,
}

impl StreamRecord {
    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            stream_id: self.id.clone(),
            status: self.status,
            playback_url: playback_url(&self.id),
            hls_url: playback_url(&self.id),
        }
    }
}

/// 流列表条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    pub stream_id: String,
    pub status: StreamStatus,
    pub playback_url: String,
    /// 旧客户端读取的字段名
    pub hls_url: String,
}

/// 创建流的结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamCreated {
    pub stream_id: String,
    pub playback_url: String,
    /// 旧客户端读取的字段名
    pub hls_url: String,
}

impl StreamCreated {
    pub fn new(stream_id: String) -> Self {
        let url = playback_url(&stream_id);
        Self {
            stream_id,
            playback_url: url.clone(),
            hls_url: url,
        }
    }
}

/// 流就绪状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamReadiness {
    pub stream_id: String,
    pub ready: bool,
}

/// 叠加层
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub id: String,
    pub stream_id: String,
    #[serde(flatten)]
    pub kind: OverlayKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlayKind {
    Text {
        text: String,
        style: String,
    },
    Image {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    AlertCard {
        data: serde_json::Value,
    },
}
