//! Record of slots that have already fired.

use std::collections::{BTreeMap, btree_map::Entry};

use {
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
    vigil_common::Language,
};

/// Ledger key → epoch millis of the firing. Never pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLedger(BTreeMap<String, u64>);

impl RunLedger {
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Record `key`. Returns `false` if it was already present.
    pub fn mark(&mut self, key: impl Into<String>, at_ms: u64) -> bool {
        match self.0.entry(key.into()) {
            Entry::Vacant(e) => {
                e.insert(at_ms);
                true
            },
            Entry::Occupied(_) => false,
        }
    }

    #[must_use]
    pub fn fired_at(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// `{date}_{primary}_long_batch_{hour}:{minute}`.
#[must_use]
pub fn long_batch_key(date: NaiveDate, primary: Language, hour: u8, minute: u8) -> String {
    format!("{}_{primary}_long_batch_{hour}:{minute}", date.format("%Y-%m-%d"))
}

/// `{date}_{lang}_short_{hour}:{minute}`.
#[must_use]
pub fn short_key(date: NaiveDate, language: Language, hour: u8, minute: u8) -> String {
    format!("{}_{language}_short_{hour}:{minute}", date.format("%Y-%m-%d"))
}
