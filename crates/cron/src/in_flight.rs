//! Counted set of running job tags, observable through a watch channel.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use {tokio::sync::watch, tracing::debug};

type Counts = BTreeMap<String, usize>;

/// Shared handle; clones observe and mutate the same set.
///
/// Tags are counted, so two overlapping runs of the same `"<lang>-<type>"`
/// job keep the tag until both finish.
#[derive(Clone)]
pub struct InFlightSet {
    tx: Arc<watch::Sender<Counts>>,
}

impl InFlightSet {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Counts::new());
        Self { tx: Arc::new(tx) }
    }

    /// Mark `tags` in flight until the returned guard is dropped.
    pub fn begin<I, S>(&self, tags: I) -> InFlightGuard
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.tx.send_modify(|counts| {
            for tag in &tags {
                *counts.entry(tag.clone()).or_default() += 1;
            }
        });
        debug!(tags = ?tags, "jobs started");
        InFlightGuard {
            set: self.clone(),
            tags,
        }
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tx.borrow().contains_key(tag)
    }

    /// Snapshot of the distinct tags currently in flight.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.tx.borrow().keys().cloned().collect()
    }

    /// Receiver notified on every start and finish.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BTreeMap<String, usize>> {
        self.tx.subscribe()
    }

    fn finish(&self, tags: &[String]) {
        self.tx.send_modify(|counts| {
            for tag in tags {
                if let Some(n) = counts.get_mut(tag) {
                    *n -= 1;
                    if *n == 0 {
                        counts.remove(tag);
                    }
                }
            }
        });
        debug!(tags = ?tags, "jobs finished");
    }
}

impl Default for InFlightSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its tags from the set when dropped, whatever the job's outcome.
#[must_use = "dropping the guard immediately clears the tags"]
pub struct InFlightGuard {
    set: InFlightSet,
    tags: Vec<String>,
}

impl InFlightGuard {
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.finish(&self.tags);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_on_drop() {
        let set = InFlightSet::new();
        {
            let _guard = set.begin(["pt-long", "en-long", "es-long"]);
            assert_eq!(set.tags().len(), 3);
            assert!(set.contains("en-long"));
        }
        assert!(set.tags().is_empty());
    }

    #[test]
    fn overlapping_tags_are_counted() {
        let set = InFlightSet::new();
        let first = set.begin(["pt-short"]);
        let second = set.begin(["pt-short"]);
        drop(first);
        assert!(set.contains("pt-short"));
        drop(second);
        assert!(!set.contains("pt-short"));
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let set = InFlightSet::new();
        let mut rx = set.subscribe();
        let guard = set.begin(["es-short"]);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().contains_key("es-short"));
        drop(guard);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
    }
}
