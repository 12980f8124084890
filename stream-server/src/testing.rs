use crate::process::{ControlSignal, ProcessControl, SignalOutcome, SpawnedProcess, Transcoder};
use async_trait::async_trait;
use common::{Result, StreamError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// 不启动真实进程的转码器
#[derive(Default)]
pub struct FakeTranscoder {
    next_pid: AtomicU32,
    pub fail: AtomicBool,
    pub spawned: Mutex<Vec<(String, PathBuf)>>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn spawn(&self, _stream_id: &str, source_url: &str, output_dir: &Path) -> Result<SpawnedProcess> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StreamError::StartFailure("no such binary".to_string()));
        }
        self.spawned
            .lock()
            .unwrap()
            .push((source_url.to_string(), output_dir.to_path_buf()));
        let pid = 10_000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
        Ok(SpawnedProcess { pid, child: None })
    }
}

/// 记录收到的信号
#[derive(Default)]
pub struct FakeControl {
    sent: Mutex<Vec<(u32, ControlSignal)>>,
    exited: Mutex<HashSet<u32>>,
    refused: Mutex<HashSet<ControlSignal>>,
}

impl FakeControl {
    pub fn sent(&self) -> Vec<(u32, ControlSignal)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn refuse(&self, signal: ControlSignal) {
        self.refused.lock().unwrap().insert(signal);
    }

    pub fn mark_exited(&self, pid: u32) {
        self.exited.lock().unwrap().insert(pid);
    }
}

impl ProcessControl for FakeControl {
    fn send(&self, pid: u32, signal: ControlSignal) -> Result<SignalOutcome> {
        self.sent.lock().unwrap().push((pid, signal));
        if self.refused.lock().unwrap().contains(&signal) {
            return Err(StreamError::SignalFailure {
                action: signal.action(),
                pid,
                reason: "Operation not permitted".to_string(),
            });
        }
        if self.exited.lock().unwrap().contains(&pid) {
            return Ok(SignalOutcome::AlreadyExited);
        }
        Ok(SignalOutcome::Delivered)
    }
}
