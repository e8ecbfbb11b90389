//! Durable small-state persistence for scheduler settings and the run ledger.

use {
    async_trait::async_trait,
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
};

use crate::Result;

/// Key → JSON value store.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

impl dyn StateStore + '_ {
    /// Typed read. A value of the wrong shape counts as absent.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed state value");
                Ok(None)
            },
        }
    }

    pub async fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?).await
    }
}
