use crate::process::ProcessHandle;
use common::StreamStatus;
use dashmap::DashMap;
use std::sync::Arc;

/// 进程内的流 → 进程句柄缓存
///
/// 仅反映本实例启动以来处理过的操作，重启后为空；权威数据在存储中。
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    handles: Arc<DashMap<String, ProcessHandle>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: ProcessHandle) {
        self.handles.insert(handle.stream_id.clone(), handle);
    }

    pub fn pid(&self, stream_id: &str) -> Option<u32> {
        self.handles.get(stream_id).map(|entry| entry.pid)
    }

    #[cfg(test)]
    pub fn status(&self, stream_id: &str) -> Option<StreamStatus> {
        self.handles.get(stream_id).map(|entry| entry.status)
    }

    pub fn set_status(&self, stream_id: &str, status: StreamStatus) -> bool {
        if let Some(mut entry) = self.handles.get_mut(stream_id) {
            entry.status = status;
            true
        } else {
            false
        }
    }

    pub fn remove(&self, stream_id: &str) -> Option<ProcessHandle> {
        self.handles.remove(stream_id).map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
