use super::transcoder::SpawnedProcess;
use common::StreamStatus;
use std::path::PathBuf;
use tokio::process::Child;
use tracing::{debug, warn};

/// 单个转码进程的进程内句柄
#[derive(Debug)]
pub struct ProcessHandle {
    pub stream_id: String,
    pub pid: u32,
    pub output_dir: PathBuf,
    pub status: StreamStatus,
    child: Option<Child>,
}

impl ProcessHandle {
    pub fn new(stream_id: String, spawned: SpawnedProcess, output_dir: PathBuf) -> Self {
        Self {
            stream_id,
            pid: spawned.pid,
            output_dir,
            status: StreamStatus::Running,
            child: spawned.child,
        }
    }

    /// 后台等待子进程退出并回收其退出状态
    pub fn reap(mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let stream_id = self.stream_id;
        let pid = self.pid;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!("Transcoder for stream {} (pid {}) exited: {}", stream_id, pid, status),
                Err(e) => warn!("Failed to reap transcoder for stream {} (pid {}): {}", stream_id, pid, e),
            }
        });
    }
}
