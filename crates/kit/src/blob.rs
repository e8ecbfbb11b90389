//! Key-value storage for binary assets (audio, images).

use std::{collections::HashMap, path::PathBuf, sync::Mutex};

use {async_trait::async_trait, bytes::Bytes, tokio::fs};

use crate::error::{Error, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn set(&self, key: &str, data: Bytes) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
}

/// One file per key under a directory.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(Error::message(format!("invalid blob key: {key}")));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blobs. No persistence.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key).cloned())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    #[tokio::test]
    async fn file_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = FileBlobStore::new(tmp.path().join("blobs"));

        assert!(store.get("history_audio_1").await.unwrap().is_none());
        store
            .set("history_audio_1", Bytes::from_static(b"RIFF"))
            .await
            .unwrap();
        store
            .set("history_audio_1", Bytes::from_static(b"RIFF2"))
            .await
            .unwrap();
        assert_eq!(
            store.get("history_audio_1").await.unwrap().unwrap(),
            Bytes::from_static(b"RIFF2")
        );
    }

    #[tokio::test]
    async fn file_store_rejects_path_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileBlobStore::new(tmp.path());
        assert!(store.set("../escape", Bytes::new()).await.is_err());
        assert!(store.get("a/b").await.is_err());
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = InMemoryBlobStore::new();
        store.set("k", Bytes::from_static(b"1")).await.unwrap();
        store.set("k", Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").await.unwrap().unwrap(), Bytes::from_static(b"2"));
    }
}
