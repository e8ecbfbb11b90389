//! Persisted list of assembled kits, newest first.

use std::{path::PathBuf, sync::Mutex};

use {
    async_trait::async_trait,
    tokio::{fs, sync::Mutex as AsyncMutex},
    tracing::debug,
};

use crate::{
    error::{Context, Error, Result},
    types::MarketingHistoryItem,
};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, item: MarketingHistoryItem) -> Result<()>;
    /// All items, newest first.
    async fn list(&self) -> Result<Vec<MarketingHistoryItem>>;
    async fn get(&self, id: &str) -> Result<Option<MarketingHistoryItem>>;
    async fn mark_downloaded(&self, id: &str) -> Result<()>;
}

/// Insert `item` and restore timestamp-descending order. Ties keep the new
/// item first.
pub fn insert_sorted(items: &mut Vec<MarketingHistoryItem>, item: MarketingHistoryItem) {
    items.insert(0, item);
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn set_downloaded(items: &mut [MarketingHistoryItem], id: &str) -> Result<()> {
    let item = items
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| Error::not_found(id))?;
    item.is_downloaded = true;
    Ok(())
}

/// Single JSON file with atomic writes.
pub struct FileHistoryStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: AsyncMutex<()>,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: AsyncMutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<MarketingHistoryItem>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn write(&self, items: &[MarketingHistoryItem]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), items = items.len(), "history written");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn insert(&self, item: MarketingHistoryItem) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        insert_sorted(&mut items, item);
        self.write(&items).await
    }

    async fn list(&self) -> Result<Vec<MarketingHistoryItem>> {
        self.load().await
    }

    async fn get(&self, id: &str) -> Result<Option<MarketingHistoryItem>> {
        Ok(self.load().await?.into_iter().find(|i| i.id == id))
    }

    async fn mark_downloaded(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;
        set_downloaded(&mut items, id)?;
        self.write(&items).await
    }
}

/// In-memory history. No persistence.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    items: Mutex<Vec<MarketingHistoryItem>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn insert(&self, item: MarketingHistoryItem) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        insert_sorted(&mut items, item);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<MarketingHistoryItem>> {
        Ok(self.items.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn get(&self, id: &str) -> Result<Option<MarketingHistoryItem>> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.iter().find(|i| i.id == id).cloned())
    }

    async fn mark_downloaded(&self, id: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        set_downloaded(&mut items, id)
    }
}
