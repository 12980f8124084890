use common::PLAYLIST_FILE;
use std::path::Path;

/// 输出目录中出现播放列表即视为可播放（不校验内容）
pub async fn is_ready(output_dir: &Path) -> bool {
    tokio::fs::metadata(output_dir.join(PLAYLIST_FILE))
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
