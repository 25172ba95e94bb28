use crate::{CaptionRecord, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait CaptionStore: Send + Sync {
    async fn insert(&self, record: CaptionRecord) -> StoreResult<()>;

    /// Records of one user, newest first.
    async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<CaptionRecord>>;

    async fn update(&self, id: &str, text: &str) -> StoreResult<CaptionRecord>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

fn validate_id(id: &str) -> StoreResult<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

fn list_by_user(records: &[CaptionRecord], user_id: &str) -> Vec<CaptionRecord> {
    let mut result: Vec<CaptionRecord> = records
        .iter()
        .filter(|v| v.user_id == user_id)
        .cloned()
        .collect();
    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    result
}

fn update(records: &mut [CaptionRecord], id: &str, text: &str) -> StoreResult<CaptionRecord> {
    validate_id(id)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::EmptyText);
    }

    let record = records
        .iter_mut()
        .find(|v| v.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    record.caption = text.to_string();
    record.updated_at = Some(Utc::now());

    Ok(record.clone())
}

fn delete(records: &mut Vec<CaptionRecord>, id: &str) -> StoreResult<()> {
    validate_id(id)?;
    let index = records
        .iter()
        .position(|v| v.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    records.remove(index);
    Ok(())
}

/// Keeps records in memory only, history is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<CaptionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaptionStore for MemoryStore {
    async fn insert(&self, record: CaptionRecord) -> StoreResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<CaptionRecord>> {
        Ok(list_by_user(&self.records.read().await, user_id))
    }

    async fn update(&self, id: &str, text: &str) -> StoreResult<CaptionRecord> {
        update(&mut self.records.write().await, id, text)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        delete(&mut *self.records.write().await, id)
    }
}

/// Keeps all records in one JSON file, rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<Vec<CaptionRecord>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("caption store {} not found, starting empty", path.display());
                vec![]
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    async fn save(&self, records: &[CaptionRecord]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CaptionStore for JsonFileStore {
    async fn insert(&self, record: CaptionRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        records.push(record);
        if let Err(e) = self.save(&records).await {
            records.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<CaptionRecord>> {
        Ok(list_by_user(&self.records.read().await, user_id))
    }

    async fn update(&self, id: &str, text: &str) -> StoreResult<CaptionRecord> {
        let mut records = self.records.write().await;
        // memory only changes once the file is written
        let mut changed = records.clone();
        let record = update(&mut changed, id, text)?;
        self.save(&changed).await?;
        *records = changed;
        Ok(record)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let mut changed = records.clone();
        delete(&mut changed, id)?;
        self.save(&changed).await?;
        *records = changed;
        Ok(())
    }
}
