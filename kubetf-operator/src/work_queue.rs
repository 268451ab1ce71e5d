use kubetf_types::ObjectKey;
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Workspaces waiting to be reconciled, each with the time it becomes due
///
/// A key is held at most once; scheduling it again keeps the earlier time.
#[derive(Debug, Default)]
pub struct WorkQueue {
    due: BTreeMap<ObjectKey, Instant>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: ObjectKey, at: Instant) {
        self.due
            .entry(key)
            .and_modify(|existing| *existing = (*existing).min(at))
            .or_insert(at);
    }

    /// Remove and return every key due at `now`
    pub fn take_due(&mut self, now: Instant) -> Vec<ObjectKey> {
        let ready: Vec<ObjectKey> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &ready {
            self.due.remove(key);
        }
        ready
    }

    pub fn len(&self) -> usize {
        self.due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.due.is_empty()
    }
}
