use common::{Result, StreamError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// 以主键区分的文档
pub trait Keyed {
    fn key(&self) -> &str;
}

/// 落盘为单个 JSON 文件的文档集合
///
/// 每次写操作都在锁内完成：先写临时文件，再原子 rename 覆盖。
pub struct JsonFileCollection<T> {
    path: PathBuf,
    items: Mutex<Vec<T>>,
}

impl<T> JsonFileCollection<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned + Send,
{
    /// 打开集合，文件不存在时视为空集合
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let items: Vec<T> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StreamError::Store(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Loaded {} document(s) from {:?}", items.len(), path);

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// 插入新文档，主键重复时报错
    pub async fn insert(&self, item: T) -> Result<()> {
        let mut items = self.items.lock().await;
        if items.iter().any(|existing| existing.key() == item.key()) {
            return Err(StreamError::Store(format!("duplicate key: {}", item.key())));
        }
        items.push(item);
        if let Err(e) = self.flush(&items).await {
            items.pop();
            return Err(e);
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.key() == key)
            .cloned()
    }

    /// 在副本上执行修改，成功后才写回
    pub async fn update<F>(&self, key: &str, apply: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let mut items = self.items.lock().await;
        let Some(index) = items.iter().position(|item| item.key() == key) else {
            return Ok(None);
        };

        let mut updated = items[index].clone();
        apply(&mut updated)?;

        let previous = std::mem::replace(&mut items[index], updated.clone());
        if let Err(e) = self.flush(&items).await {
            items[index] = previous;
            return Err(e);
        }
        Ok(Some(updated))
    }

    pub async fn remove(&self, key: &str) -> Result<Option<T>> {
        let mut items = self.items.lock().await;
        let Some(index) = items.iter().position(|item| item.key() == key) else {
            return Ok(None);
        };

        let removed = items.remove(index);
        if let Err(e) = self.flush(&items).await {
            items.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// 按插入顺序返回全部文档
    pub async fn all(&self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    async fn flush(&self, items: &[T]) -> Result<()> {
        let json = serde_json::to_vec_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Flushed {} document(s) to {:?}", items.len(), self.path);
        Ok(())
    }
}
