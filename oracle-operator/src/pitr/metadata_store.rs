//! Durable, versioned index of [`LogEntry`] records for a single PITR
//! instance (§3's `MetadataStore`): a single JSON document at
//! `<root>/metadata.json`, guarded by an optimistic-concurrency version
//! token per §9's "avoid multi-writer designs" note.
//!
//! Writers go through a compare-and-swap retry loop keyed on the object
//! store's own conditional-put support; readers (including the Status API)
//! just re-fetch the document, since the whole thing is small enough to
//! treat as a value rather than a store to index incrementally.

use crate::error::PitrError;
use chrono::{DateTime, Utc};
use object_store::{path::Path, ObjectStore, PutMode, PutOptions, UpdateVersion};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};

/// A shipped archived redo log's metadata (§3). `(thread, sequence,
/// incarnation)` is unique within a store's active history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Stable content hash of the log, also its `HashStore` key.
    pub key: String,
    /// Redo thread number.
    pub thread: u32,
    /// Log sequence number within the thread.
    pub sequence: u64,
    /// Database incarnation this log belongs to.
    pub incarnation: u32,
    /// SCN at the start of the log.
    pub first_change: u64,
    /// SCN at the end of the log.
    pub next_change: u64,
    /// Wall-clock time of `first_change`.
    pub first_time: DateTime<Utc>,
    /// Wall-clock time of `next_change`.
    pub next_time: DateTime<Utc>,
    /// Size of the shipped log object, in bytes.
    pub size_bytes: u64,
    /// Object-store path the log contents were written to.
    pub object_path: String,
}

/// The on-disk document shape: entries plus their `KeyToLogEntry` insertion
/// order (§3), which is independent of a map's own iteration order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Document {
    order: Vec<String>,
    entries: std::collections::BTreeMap<String, LogEntry>,
}

/// Versioned `LogEntry` index for a single PITR instance.
pub struct MetadataStore {
    store: Arc<dyn ObjectStore>,
    path: Path,
}

const MAX_CAS_ATTEMPTS: u32 = 10;

impl MetadataStore {
    /// Opens the store at `<root>/metadata.json`.
    pub fn new(store: Arc<dyn ObjectStore>, root: &Path) -> Self {
        MetadataStore {
            store,
            path: root.child("metadata.json"),
        }
    }

    async fn load(&self) -> Result<(Document, Option<UpdateVersion>), PitrError> {
        match self.store.get(&self.path).await {
            Ok(result) => {
                let version = UpdateVersion {
                    e_tag: result.meta.e_tag.clone(),
                    version: result.meta.version.clone(),
                };
                let bytes = result.bytes().await?;
                let doc = if bytes.is_empty() {
                    Document::default()
                } else {
                    serde_json::from_slice(&bytes).map_err(|e| PitrError::CorruptMetadata(e.to_string()))?
                };
                Ok((doc, Some(version)))
            }
            Err(object_store::Error::NotFound { .. }) => Ok((Document::default(), None)),
            Err(e) => Err(e.into()),
        }
    }

    /// All entries in `KeyToLogEntry` order.
    pub async fn entries(&self) -> Result<Vec<LogEntry>, PitrError> {
        let (doc, _) = self.load().await?;
        Ok(doc.order.iter().filter_map(|k| doc.entries.get(k)).cloned().collect())
    }

    /// All keys currently present in the store.
    pub async fn keys(&self) -> Result<HashSet<String>, PitrError> {
        let (doc, _) = self.load().await?;
        Ok(doc.entries.keys().cloned().collect())
    }

    /// Appends a new entry, or overwrites an existing one with the same
    /// key, under the CAS retry loop (§4.4.2).
    pub async fn upsert(&self, entry: LogEntry) -> Result<(), PitrError> {
        self.commit(move |doc| {
            if !doc.entries.contains_key(&entry.key) {
                doc.order.push(entry.key.clone());
            }
            doc.entries.insert(entry.key.clone(), entry.clone());
        })
        .await
    }

    /// Removes an entry by key (§4.4.3's retention delete); missing keys are
    /// a no-op, not an error.
    pub async fn remove(&self, key: &str) -> Result<(), PitrError> {
        let key = key.to_string();
        self.commit(move |doc| {
            doc.entries.remove(&key);
            doc.order.retain(|k| k != &key);
        })
        .await
    }

    async fn commit(&self, mutate: impl Fn(&mut Document)) -> Result<(), PitrError> {
        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let (mut doc, version) = self.load().await?;
            mutate(&mut doc);
            let bytes = serde_json::to_vec(&doc)?;
            let mode = match version {
                Some(v) => PutMode::Update(v),
                None => PutMode::Create,
            };
            let opts = PutOptions {
                mode,
                ..Default::default()
            };
            match self.store.put_opts(&self.path, bytes.into(), opts).await {
                Ok(_) => return Ok(()),
                Err(object_store::Error::Precondition { .. }) | Err(object_store::Error::AlreadyExists { .. }) => {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PitrError::MetadataConflict {
            attempts: MAX_CAS_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn entry(key: &str, thread: u32, sequence: u64) -> LogEntry {
        LogEntry {
            key: key.to_string(),
            thread,
            sequence,
            incarnation: 1,
            first_change: sequence * 1000,
            next_change: (sequence + 1) * 1000,
            first_time: Utc::now(),
            next_time: Utc::now(),
            size_bytes: 128,
            object_path: format!("logs/{key}"),
        }
    }

    #[tokio::test]
    async fn upsert_then_read_back() {
        let store = MetadataStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod"));
        store.upsert(entry("a", 1, 10)).await.unwrap();
        store.upsert(entry("b", 1, 11)).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[1].key, "b");
    }

    #[tokio::test]
    async fn preserves_insertion_order_across_updates() {
        let store = MetadataStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod"));
        store.upsert(entry("a", 1, 10)).await.unwrap();
        store.upsert(entry("b", 1, 11)).await.unwrap();
        let mut updated = entry("a", 1, 10);
        updated.size_bytes = 999;
        store.upsert(updated).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(entries[0].size_bytes, 999);
    }

    #[tokio::test]
    async fn remove_drops_key_and_order_entry() {
        let store = MetadataStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod"));
        store.upsert(entry("a", 1, 10)).await.unwrap();
        store.upsert(entry("b", 1, 11)).await.unwrap();
        store.remove("a").await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "b");

        // Idempotent.
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_upserts_both_survive_via_cas_retry() {
        let store = Arc::new(MetadataStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod")));
        let (a, b) = tokio::join!(store.upsert(entry("a", 1, 10)), store.upsert(entry("b", 2, 20)),);
        a.unwrap();
        b.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
    }
}
