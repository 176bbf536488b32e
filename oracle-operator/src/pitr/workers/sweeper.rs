//! Orphan sweeper (§4.4.3.1): a fourth, lower-frequency background loop that
//! reclaims two kinds of orphaned `logs/<key>` objects:
//!
//! - an object with no matching `hash/<key>` marker, left behind by an
//!   upload that was interrupted before the replication worker's HashStore
//!   commit (§4.4.1's crash-safety note);
//! - an object whose marker *is* present but whose key has been absent from
//!   MetadataStore for longer than the grace period, left behind by the
//!   retention worker's HashStore-after-MetadataStore delete order
//!   (§4.4.3).
//!
//! Either way the object's own last-modified time must exceed the grace
//! period before it's touched, so the sweep never races an in-flight
//! upload.

use crate::pitr::{hash_store::HashStore, metadata_store::MetadataStore, state::EngineState};
use chrono::{Duration as ChronoDuration, Utc};
use futures::TryStreamExt;
use object_store::{path::Path, ObjectStore};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reclaims `logs/<key>` objects orphaned by an interrupted upload or a
/// retention delete, once they're older than `grace_period`.
pub struct Sweeper {
    /// Backing object store.
    pub store: Arc<dyn ObjectStore>,
    /// PITR instance's root path under `storageURI`.
    pub logs_root: Path,
    /// The content-addressed dedup index.
    pub hash_store: Arc<HashStore>,
    /// The `LogEntry` index.
    pub metadata_store: Arc<MetadataStore>,
    /// Shared engine lifecycle state.
    pub state: Arc<EngineState>,
    /// How often to run a sweep pass.
    pub poll_interval: Duration,
    /// Minimum object age before it's eligible for reclamation.
    pub grace_period: Duration,
}

impl Sweeper {
    /// Runs one sweep pass, returning the number of objects reclaimed.
    pub async fn sweep_once(&self) -> Result<usize, crate::error::PitrError> {
        let logs_prefix = self.logs_root.child("logs");
        let grace = ChronoDuration::from_std(self.grace_period).unwrap_or_else(|_| ChronoDuration::seconds(0));
        let horizon = Utc::now() - grace;

        let known_keys = self.metadata_store.keys().await?;
        let mut reclaimed = 0;
        let mut stream = self.store.list(Some(&logs_prefix));
        while let Some(meta) = stream.try_next().await? {
            let Some(key) = meta.location.filename().map(str::to_string) else {
                continue;
            };
            if meta.last_modified > horizon {
                continue;
            }

            let has_marker = self.hash_store.contains(&key).await?;
            let is_orphan = !has_marker || !known_keys.contains(&key);
            if !is_orphan {
                continue;
            }

            match self.store.delete(&meta.location).await {
                Ok(()) => {
                    reclaimed += 1;
                    debug!(key, "swept orphaned log object");
                }
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => {
                    warn!(key, error = %e, "failed to delete orphaned log object");
                }
            }
        }
        Ok(reclaimed)
    }

    /// Runs sweep passes on `poll_interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            match self.sweep_once().await {
                Ok(count) => {
                    if count > 0 {
                        info!(reclaimed = count, "sweeper reclaimed orphaned log objects");
                    } else {
                        debug!("sweeper found no orphans");
                    }
                    self.state.mark_healthy();
                }
                Err(e) => {
                    error!(error = %e, "orphan sweep pass failed");
                    self.state.mark_degraded(format!("sweeper: {e}"));
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;

    async fn sweeper() -> (Sweeper, Arc<dyn ObjectStore>, Path) {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let root = Path::from("pitr/prod");
        let hash_store = Arc::new(HashStore::new(store.clone(), &root));
        let metadata_store = Arc::new(MetadataStore::new(store.clone(), &root));
        let sweeper = Sweeper {
            store: store.clone(),
            logs_root: root.clone(),
            hash_store,
            metadata_store,
            state: Arc::new(EngineState::default()),
            poll_interval: Duration::from_secs(1),
            grace_period: Duration::from_secs(0),
        };
        (sweeper, store, root)
    }

    #[tokio::test]
    async fn reclaims_object_with_no_hash_marker() {
        let (sweeper, store, root) = sweeper().await;
        let object_path = root.child("logs").child("orphan-key");
        store.put(&object_path, Bytes::from_static(b"data").into()).await.unwrap();

        let reclaimed = sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 1);
        assert!(store.head(&object_path).await.is_err());
    }

    #[tokio::test]
    async fn leaves_object_with_marker_and_metadata_entry_alone() {
        let (sweeper, store, root) = sweeper().await;
        let key = "referenced-key";
        let object_path = root.child("logs").child(key);
        store.put(&object_path, Bytes::from_static(b"data").into()).await.unwrap();
        sweeper.hash_store.insert(key).await.unwrap();
        sweeper
            .metadata_store
            .upsert(crate::pitr::metadata_store::LogEntry {
                key: key.to_string(),
                thread: 1,
                sequence: 1,
                incarnation: 1,
                first_change: 0,
                next_change: 100,
                first_time: Utc::now(),
                next_time: Utc::now(),
                size_bytes: 4,
                object_path: object_path.to_string(),
            })
            .await
            .unwrap();

        let reclaimed = sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 0);
        assert!(store.head(&object_path).await.is_ok());
    }

    #[tokio::test]
    async fn reclaims_marker_present_but_metadata_evicted() {
        let (sweeper, store, root) = sweeper().await;
        let key = "evicted-key";
        let object_path = root.child("logs").child(key);
        store.put(&object_path, Bytes::from_static(b"data").into()).await.unwrap();
        sweeper.hash_store.insert(key).await.unwrap();

        let reclaimed = sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 1);
    }
}
