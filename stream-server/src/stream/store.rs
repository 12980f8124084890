use crate::storage::{JsonFileCollection, Keyed};
use async_trait::async_trait;
use common::{Result, StreamRecord, StreamStatus};
use std::path::PathBuf;

impl Keyed for StreamRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// 持久化的流记录存储，跨重启的权威数据源
#[async_trait]
pub trait StreamStore: Send + Sync {
    /// 插入记录，id 重复时报错
    async fn insert(&self, record: StreamRecord) -> Result<()>;

    async fn get(&self, stream_id: &str) -> Result<Option<StreamRecord>>;

    /// 返回记录是否存在
    async fn set_status(&self, stream_id: &str, status: StreamStatus) -> Result<bool>;

    async fn remove(&self, stream_id: &str) -> Result<Option<StreamRecord>>;

    /// 按创建时间排序
    async fn list(&self) -> Result<Vec<StreamRecord>>;
}

/// JSON 文件实现
pub struct JsonStreamStore {
    records: JsonFileCollection<StreamRecord>,
}

impl JsonStreamStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            records: JsonFileCollection::open(path).await?,
        })
    }
}

#[async_trait]
impl StreamStore for JsonStreamStore {
    async fn insert(&self, record: StreamRecord) -> Result<()> {
        self.records.insert(record).await
    }

    async fn get(&self, stream_id: &str) -> Result<Option<StreamRecord>> {
        Ok(self.records.get(stream_id).await)
    }

    async fn set_status(&self, stream_id: &str, status: StreamStatus) -> Result<bool> {
        let updated = self
            .records
            .update(stream_id, |record| {
                record.status = status;
                Ok(())
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn remove(&self, stream_id: &str) -> Result<Option<StreamRecord>> {
        self.records.remove(stream_id).await
    }

    async fn list(&self) -> Result<Vec<StreamRecord>> {
        let mut records = self.records.all().await;
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn record(id: &str, age_secs: i64) -> StreamRecord {
        StreamRecord {
            id: id.to_string(),
            source_url: "rtsp://cam.local/1".to_string(),
            output_dir: PathBuf::from("/tmp").join(id),
            process_id: Some(4242),
            status: StreamStatus::Running,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("streams.json");

        let store = JsonStreamStore::open(&path).await.unwrap();
        store.insert(record("a", 0)).await.unwrap();
        assert!(store.set_status("a", StreamStatus::Paused).await.unwrap());
        drop(store);

        let reopened = JsonStreamStore::open(&path).await.unwrap();
        let loaded = reopened.get("a").await.unwrap().unwrap();
        assert_eq!(loaded.status, StreamStatus::Paused);
        assert_eq!(loaded.process_id, Some(4242));
    }

    #[tokio::test]
    async fn test_list_ordered_by_creation() {
        let dir = tempdir().unwrap();
        let store = JsonStreamStore::open(dir.path().join("streams.json")).await.unwrap();

        store.insert(record("newest", 0)).await.unwrap();
        store.insert(record("oldest", 60)).await.unwrap();
        store.insert(record("middle", 30)).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["oldest", "middle", "newest"]);
    }

    #[tokio::test]
    async fn test_missing_records() {
        let dir = tempdir().unwrap();
        let store = JsonStreamStore::open(dir.path().join("streams.json")).await.unwrap();

        assert!(store.get("missing").await.unwrap().is_none());
        assert!(!store.set_status("missing", StreamStatus::Paused).await.unwrap());
        assert!(store.remove("missing").await.unwrap().is_none());
        assert!(store.insert(record("a", 0)).await.is_ok());
        assert!(store.insert(record("a", 0)).await.is_err());
    }
}
