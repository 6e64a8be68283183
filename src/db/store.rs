use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::db::entities::watchdog_entry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No entry found for ('{namespace}', '{id}')")]
    NotFound { namespace: String, id: String },
}

type EntryKey = (String, String);

/// In-memory keyed storage for watchdog entries, namespaced by a prefix such as `"dog"`.
///
/// The whole map sits behind one lock. Entry counts are small and writes are
/// rare, and the lock is never held across I/O.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: RwLock<HashMap<EntryKey, watchdog_entry::Model>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, namespace: &str, id: &str) -> Result<watchdog_entry::Model, StoreError> {
        let entries = self.entries.read().await;
        entries
            .get(&key(namespace, id))
            .cloned()
            .ok_or_else(|| not_found(namespace, id))
    }

    pub async fn set(&self, namespace: &str, id: &str, entry: watchdog_entry::Model) {
        let mut entries = self.entries.write().await;
        entries.insert(key(namespace, id), entry);
    }

    /// Applies `f` to the stored entry under the write lock and returns the result.
    pub async fn update<F>(
        &self,
        namespace: &str,
        id: &str,
        f: F,
    ) -> Result<watchdog_entry::Model, StoreError>
    where
        F: FnOnce(&mut watchdog_entry::Model),
    {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&key(namespace, id))
            .ok_or_else(|| not_found(namespace, id))?;
        f(entry);
        Ok(entry.clone())
    }

    /// Point-in-time copy of every entry in `namespace`, keyed by id.
    pub async fn snapshot(&self, namespace: &str) -> BTreeMap<String, watchdog_entry::Model> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, id), entry)| (id.clone(), entry.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn key(namespace: &str, id: &str) -> EntryKey {
    (namespace.to_string(), id.to_string())
}

fn not_found(namespace: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        namespace: namespace.to_string(),
        id: id.to_string(),
    }
}
