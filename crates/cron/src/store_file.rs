//! JSON file-backed state store with atomic writes.

use std::path::PathBuf;

use {
    async_trait::async_trait,
    serde_json::{Map, Value},
    tokio::{fs, sync::Mutex},
};

use crate::{
    error::{Context, Result},
    store::StateStore,
};

/// All keys in a single JSON object file.
///
/// Every `set` re-reads the file and replaces only its own key, so separate
/// instances on the same path (the running agent and a CLI invocation) keep
/// each other's keys. The write lock is per instance: two processes writing
/// in the same instant can still lose the earlier of the two updates.
pub struct FileStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load_all(&self) -> Result<Map<String, Value>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Map::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, state: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load_all().await?.remove(key))
    }

    /// Merge one key into the file as it is on disk now.
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load_all().await?;
        state.insert(key.to_string(), value);
        self.atomic_write(&state).await
    }
}
