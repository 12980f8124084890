use super::readiness;
use super::registry::ProcessRegistry;
use super::store::StreamStore;
use crate::process::{ControlSignal, ProcessControl, ProcessHandle, SignalOutcome, Transcoder};
use chrono::Utc;
use common::{
    Result, StreamCreated, StreamError, StreamReadiness, StreamRecord, StreamStatus,
    StreamSummary,
};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 流生命周期管理
///
/// 进程号先查进程内注册表，未命中再查持久化存储，因此重启后依然可以
/// 对仍在运行的转码进程发送信号。写操作总是先写存储再写注册表。
#[derive(Clone)]
pub struct StreamManager {
    streams_root: PathBuf,
    store: Arc<dyn StreamStore>,
    registry: ProcessRegistry,
    transcoder: Arc<dyn Transcoder>,
    control: Arc<dyn ProcessControl>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl StreamManager {
    pub fn new(
        streams_root: PathBuf,
        store: Arc<dyn StreamStore>,
        transcoder: Arc<dyn Transcoder>,
        control: Arc<dyn ProcessControl>,
    ) -> Self {
        info!("Initializing stream manager at: {:?}", streams_root);

        Self {
            streams_root,
            store,
            registry: ProcessRegistry::new(),
            transcoder,
            control,
            locks: Arc::new(DashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// 创建流：建目录、启动转码器、写入记录
    pub async fn create(&self, source_url: &str) -> Result<StreamCreated> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(StreamError::Validation("missing sourceUrl".to_string()));
        }

        let stream_id = Uuid::new_v4().to_string();
        let output_dir = self.streams_root.join(&stream_id);

        tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
            StreamError::StartFailure(format!("failed to create {}: {}", output_dir.display(), e))
        })?;

        let spawned = match self.transcoder.spawn(&stream_id, source_url, &output_dir).await {
            Ok(spawned) => spawned,
            Err(e) => {
                error!("Failed to start stream {}: {}", stream_id, e);
                remove_output_dir(&output_dir).await;
                return Err(e);
            }
        };
        let pid = spawned.pid;

        let record = StreamRecord {
            id: stream_id.clone(),
            source_url: source_url.to_string(),
            output_dir: output_dir.clone(),
            process_id: Some(pid),
            status: StreamStatus::Running,
            created_at: Utc::now(),
        };

        let handle = ProcessHandle::new(stream_id.clone(), spawned, output_dir.clone());

        // 没有记录就不能留下进程
        if let Err(e) = self.store.insert(record).await {
            error!("Failed to persist stream {}: {}", stream_id, e);
            self.terminate(pid);
            handle.reap();
            remove_output_dir(&output_dir).await;
            return Err(e);
        }

        self.registry.insert(handle);

        info!("Stream {} started from {} (pid {})", stream_id, source_url, pid);
        Ok(StreamCreated::new(stream_id))
    }

    /// 注册表优先，未命中时回退到存储
    pub async fn resolve_process_id(&self, stream_id: &str) -> Result<Option<u32>> {
        if let Some(pid) = self.registry.pid(stream_id) {
            return Ok(Some(pid));
        }
        Ok(self
            .store
            .get(stream_id)
            .await?
            .and_then(|record| record.process_id))
    }

    /// 挂起转码进程（SIGSTOP）
    pub async fn pause(&self, stream_id: &str) -> Result<()> {
        self.signal_and_mark(stream_id, ControlSignal::Suspend, StreamStatus::Paused)
            .await
    }

    /// 恢复转码进程（SIGCONT）
    pub async fn resume(&self, stream_id: &str) -> Result<()> {
        self.signal_and_mark(stream_id, ControlSignal::Continue, StreamStatus::Running)
            .await
    }

    async fn signal_and_mark(
        &self,
        stream_id: &str,
        signal: ControlSignal,
        status: StreamStatus,
    ) -> Result<()> {
        let _guard = self.lock(stream_id).await;
        let pid = self.require_process_id(stream_id).await?;

        if self.control.send(pid, signal)? == SignalOutcome::AlreadyExited {
            warn!("Transcoder for stream {} (pid {}) has already exited", stream_id, pid);
        }

        self.store.set_status(stream_id, status).await?;
        self.registry.set_status(stream_id, status);

        info!("Stream {}: {} (pid {})", stream_id, signal.action(), pid);
        Ok(())
    }

    /// 停止流
    ///
    /// 进程号解析成功后总是成功：信号失败和目录清理失败只记录日志。
    pub async fn stop(&self, stream_id: &str) -> Result<()> {
        let _guard = self.lock(stream_id).await;
        let pid = self.require_process_id(stream_id).await?;

        self.terminate(pid);

        let record = self.store.remove(stream_id).await?;
        let handle = self.registry.remove(stream_id);

        let output_dir = record
            .map(|record| record.output_dir)
            .or_else(|| handle.as_ref().map(|handle| handle.output_dir.clone()));

        if let Some(handle) = handle {
            handle.reap();
        }

        if let Some(output_dir) = output_dir {
            remove_output_dir(&output_dir).await;
        }

        self.locks.remove(stream_id);
        info!(
            "Stream {} stopped (pid {}), {} process(es) still tracked",
            stream_id,
            pid,
            self.registry.len()
        );
        Ok(())
    }

    /// 只查存储，刚重启、注册表为空时也能回答
    pub async fn status(&self, stream_id: &str) -> Result<StreamReadiness> {
        let ready = match self.store.get(stream_id).await? {
            Some(record) => readiness::is_ready(&record.output_dir).await,
            None => false,
        };
        Ok(StreamReadiness {
            stream_id: stream_id.to_string(),
            ready,
        })
    }

    /// 所有活跃的流（停止的流没有记录）
    pub async fn list(&self) -> Result<Vec<StreamSummary>> {
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .map(StreamRecord::summary)
            .collect())
    }

    /// 分片文件所在目录：本地目录优先，否则使用记录中的目录
    pub async fn segment_dir(&self, stream_id: &str) -> Result<Option<PathBuf>> {
        if Uuid::parse_str(stream_id).is_err() {
            return Ok(None);
        }

        let local = self.streams_root.join(stream_id);
        if tokio::fs::metadata(&local)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            return Ok(Some(local));
        }

        Ok(self
            .store
            .get(stream_id)
            .await?
            .map(|record| record.output_dir))
    }

    async fn require_process_id(&self, stream_id: &str) -> Result<u32> {
        match self.resolve_process_id(stream_id).await? {
            Some(pid) => Ok(pid),
            None => {
                self.locks.remove(stream_id);
                Err(StreamError::NotRunning(stream_id.to_string()))
            }
        }
    }

    /// SIGTERM 后补发 SIGCONT，失败（进程已退出除外）时升级为 SIGKILL
    ///
    /// 被 SIGSTOP 暂停的进程在收到 SIGCONT 之前不会处理 SIGTERM。
    fn terminate(&self, pid: u32) {
        let escalate = match self.control.send(pid, ControlSignal::Terminate) {
            Ok(SignalOutcome::Delivered) => {
                debug!("Sent SIGTERM to pid {}", pid);
                self.control.send(pid, ControlSignal::Continue).err()
            }
            Ok(SignalOutcome::AlreadyExited) => {
                debug!("Process {} already exited", pid);
                None
            }
            Err(e) => Some(e),
        };

        if let Some(e) = escalate {
            warn!("{}, escalating to SIGKILL", e);
            if let Err(kill_err) = self.control.send(pid, ControlSignal::Kill) {
                error!("Failed to kill process {}: {}", pid, kill_err);
            }
        }
    }

    /// 同一个流上的操作串行执行
    async fn lock(&self, stream_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(stream_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// 删除输出目录，不存在视为成功，失败只记录日志
async fn remove_output_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Removed output directory {:?}", dir),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Error cleaning up directory {:?}: {}", dir, e),
    }
}
