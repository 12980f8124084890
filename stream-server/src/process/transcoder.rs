use async_trait::async_trait;
use common::{Result, StreamError, PLAYLIST_FILE};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info};

/// HLS 分片时长（秒）
pub const HLS_SEGMENT_SECONDS: u32 = 2;
/// 播放列表保留的分片数
pub const HLS_LIST_SIZE: u32 = 6;

/// 已启动的转码进程
#[derive(Debug)]
pub struct SpawnedProcess {
    pub pid: u32,
    /// 用于回收退出状态；测试替身可以为空
    pub child: Option<Child>,
}

/// 外部转码器
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn spawn(&self, stream_id: &str, source_url: &str, output_dir: &Path) -> Result<SpawnedProcess>;
}

/// 调用 ffmpeg 可执行文件，将 RTSP 转为滑动窗口 HLS
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 固定的命令行参数
    pub fn args(source_url: &str, output_dir: &Path) -> Vec<OsString> {
        let hls_time = HLS_SEGMENT_SECONDS.to_string();
        let list_size = HLS_LIST_SIZE.to_string();
        let mut args: Vec<OsString> = [
            "-nostdin",
            "-rtsp_transport",
            "tcp",
            "-i",
            source_url,
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-tune",
            "zerolatency",
            "-c:a",
            "aac",
            "-f",
            "hls",
            "-hls_time",
            hls_time.as_str(),
            "-hls_list_size",
            list_size.as_str(),
            "-hls_flags",
            "delete_segments+append_list+program_date_time",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(output_dir.join(PLAYLIST_FILE).into_os_string());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn spawn(&self, stream_id: &str, source_url: &str, output_dir: &Path) -> Result<SpawnedProcess> {
        let mut child = Command::new(&self.program)
            .args(Self::args(source_url, output_dir))
            .current_dir(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StreamError::StartFailure(format!("failed to spawn {}: {}", self.program.display(), e))
            })?;

        let pid = child.id().ok_or_else(|| {
            StreamError::StartFailure("transcoder exited before its pid was known".to_string())
        })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stream_id.to_string(), stderr));
        }

        info!("Spawned transcoder for stream {} (pid {})", stream_id, pid);
        Ok(SpawnedProcess {
            pid,
            child: Some(child),
        })
    }
}

/// 持续读取 stderr，避免管道写满阻塞子进程
async fn drain_stderr(stream_id: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!("[ffmpeg {}] {}", stream_id, line),
            Ok(None) => break,
            Err(e) => {
                debug!("stderr of stream {} closed: {}", stream_id, e);
                break;
            }
        }
    }
}
