//! Content-addressed index of already-shipped archived logs (§3's
//! `HashStore`): an append-only `key -> objectPath` mapping realised as
//! zero-byte marker objects under `<root>/hash/<hex>` (§6) — the key's mere
//! presence is the signal, so the store is idempotent by construction.
//!
//! An in-memory cache mirrors the object store so a replication pass's
//! repeated `contains` checks don't each round-trip to GCS; it is warmed
//! once at worker startup and kept current by `insert`/`remove`.

use crate::error::PitrError;
use bytes::Bytes;
use object_store::{path::Path, ObjectStore};
use sha2::{Digest, Sha256};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::RwLock;

/// Streaming content hash used as the HashStore key (§4.4.1's
/// `key = hash(contents)`).
pub fn hash_contents(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hex::encode(hasher.finalize())
}

/// Content-addressed index of already-shipped logs, with an in-memory mirror.
#[derive(Clone)]
pub struct HashStore {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
    cache: Arc<RwLock<HashSet<String>>>,
}

impl HashStore {
    /// Opens the store at `<root>/hash`.
    pub fn new(store: Arc<dyn ObjectStore>, root: &Path) -> Self {
        HashStore {
            store,
            prefix: root.child("hash"),
            cache: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    fn marker_path(&self, key: &str) -> Path {
        self.prefix.child(key)
    }

    /// Populates the in-memory cache from the object store's current
    /// contents; cheap to call repeatedly (idempotent), intended to run once
    /// before a worker's main loop starts.
    pub async fn warm_cache(&self) -> Result<(), PitrError> {
        use futures::TryStreamExt;
        let mut stream = self.store.list(Some(&self.prefix));
        let mut cache = self.cache.write().await;
        while let Some(meta) = stream.try_next().await? {
            if let Some(key) = meta.location.filename() {
                cache.insert(key.to_string());
            }
        }
        Ok(())
    }

    /// Whether `key` is already present, checking the cache before the store.
    pub async fn contains(&self, key: &str) -> Result<bool, PitrError> {
        if self.cache.read().await.contains(key) {
            return Ok(true);
        }
        match self.store.head(&self.marker_path(key)).await {
            Ok(_) => {
                self.cache.write().await.insert(key.to_string());
                Ok(true)
            }
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// The commit point for a shipped log (§5's ordering guarantee: upload,
    /// *then* HashStore commit, then MetadataStore commit).
    pub async fn insert(&self, key: &str) -> Result<(), PitrError> {
        self.store.put(&self.marker_path(key), Bytes::new().into()).await?;
        self.cache.write().await.insert(key.to_string());
        Ok(())
    }

    /// Used by the retention worker after a MetadataStore commit removes an
    /// entry; `NotFound` is success (§7's "not-found on delete" rule).
    pub async fn remove(&self, key: &str) -> Result<(), PitrError> {
        match self.store.delete(&self.marker_path(key)).await {
            Ok(()) => {}
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        self.cache.write().await.remove(key);
        Ok(())
    }

    /// A snapshot of every key currently cached.
    pub async fn keys(&self) -> HashSet<String> {
        self.cache.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn store() -> HashStore {
        HashStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod"))
    }

    #[tokio::test]
    async fn insert_then_contains() {
        let hs = store();
        let key = hash_contents(b"log contents");
        assert!(!hs.contains(&key).await.unwrap());
        hs.insert(&key).await.unwrap();
        assert!(hs.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn deduplicates_identical_contents() {
        let hs = store();
        let a = hash_contents(b"same bytes");
        let b = hash_contents(b"same bytes");
        assert_eq!(a, b);
        hs.insert(&a).await.unwrap();
        assert!(hs.contains(&b).await.unwrap());
        assert_eq!(hs.keys().await.len(), 1);
    }

    #[tokio::test]
    async fn warm_cache_picks_up_existing_markers() {
        let backing = Arc::new(InMemory::new());
        let root = Path::from("pitr/prod");
        let warm_up = HashStore::new(backing.clone(), &root);
        let key = hash_contents(b"pre-existing");
        warm_up.insert(&key).await.unwrap();

        let fresh = HashStore::new(backing, &root);
        assert!(fresh.keys().await.is_empty());
        fresh.warm_cache().await.unwrap();
        assert!(fresh.keys().await.contains(&key));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let hs = store();
        let key = hash_contents(b"to remove");
        hs.insert(&key).await.unwrap();
        hs.remove(&key).await.unwrap();
        hs.remove(&key).await.unwrap();
        assert!(!hs.contains(&key).await.unwrap());
    }
}
