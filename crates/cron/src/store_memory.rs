//! In-memory state store for tests.

use std::{collections::HashMap, sync::Mutex};

use {async_trait::async_trait, serde_json::Value};

use crate::{Result, store::StateStore};

/// In-memory store backed by `HashMap`. No persistence.
#[derive(Default)]
pub struct InMemoryStateStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: Mutex<bool>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(crate::Error::message(format!("write rejected: {key}")));
        }
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}
