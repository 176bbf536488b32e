//! Log Retention Worker (§4.4.3): deletes MetadataStore entries older than
//! the configured retention window, but only when doing so leaves the
//! PITR-recoverable range still contiguous back to `now - retentionDays`
//! (§4.4.3's deletion-safety check, [`window::covers`]).
//!
//! Deletion order is MetadataStore commit, then HashStore marker, then the
//! underlying log object — each step is independently safe to fail after:
//! an entry removed from MetadataStore but still present in HashStore is
//! simply never reconsidered for deletion again until its marker is also
//! gone, and an orphaned log object is reclaimed by the sweeper (§4.4.3.1).

use crate::pitr::{
    hash_store::HashStore,
    metadata_store::MetadataStore,
    state::EngineState,
    window::covers,
};
use chrono::{Duration as ChronoDuration, Utc};
use object_store::{path::Path, ObjectStore};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Garbage-collects MetadataStore entries past the retention horizon while
/// keeping the recoverable window contiguous.
pub struct RetentionWorker {
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
    /// How often to run a reclaim pass.
    pub poll_interval: Duration,
    /// Retention horizon, in days.
    pub retention_days: u32,
}

impl RetentionWorker {
    /// Runs one reclaim pass, returning the number of entries removed.
    pub async fn reclaim_once(&self) -> Result<usize, crate::error::PitrError> {
        let entries = self.metadata_store.entries().await?;
        let now = Utc::now();
        let retention = ChronoDuration::days(self.retention_days as i64);
        let horizon = now - retention;

        let mut reclaimed = 0;
        for entry in entries.iter().filter(|e| e.first_time < horizon) {
            if !covers(&entries, entry, now, retention) {
                continue;
            }

            self.metadata_store.remove(&entry.key).await?;
            self.hash_store.remove(&entry.key).await?;

            let object_path = self.logs_root.child("logs").child(entry.key.as_str());
            match self.store.delete(&object_path).await {
                Ok(()) => {}
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
            reclaimed += 1;
        }
        Ok(reclaimed)
    }

    /// Runs reclaim passes on `poll_interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            match self.reclaim_once().await {
                Ok(count) => {
                    if count > 0 {
                        info!(reclaimed = count, "retention worker reclaimed expired logs");
                    } else {
                        debug!("no logs eligible for retention reclaim");
                    }
                    self.state.mark_healthy();
                }
                Err(e) => {
                    error!(error = %e, "retention pass failed");
                    self.state.mark_degraded(format!("retention: {e}"));
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
    use crate::pitr::metadata_store::LogEntry;
    use chrono::TimeZone;
    use object_store::memory::InMemory;

    fn entry(key: &str, thread: u32, sequence: u64, first_secs: i64, next_secs: i64) -> LogEntry {
        LogEntry {
            key: key.to_string(),
            thread,
            sequence,
            incarnation: 1,
            first_change: sequence * 100,
            next_change: (sequence + 1) * 100,
            first_time: Utc.timestamp_opt(first_secs, 0).unwrap(),
            next_time: Utc.timestamp_opt(next_secs, 0).unwrap(),
            size_bytes: 10,
            object_path: format!("logs/{key}"),
        }
    }

    async fn worker(retention_days: u32) -> (RetentionWorker, Arc<MetadataStore>, Arc<HashStore>) {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let root = Path::from("pitr/prod");
        let metadata_store = Arc::new(MetadataStore::new(store.clone(), &root));
        let hash_store = Arc::new(HashStore::new(store.clone(), &root));
        let worker = RetentionWorker {
            store,
            logs_root: root,
            hash_store: hash_store.clone(),
            metadata_store: metadata_store.clone(),
            state: Arc::new(EngineState::default()),
            poll_interval: Duration::from_secs(1),
            retention_days,
        };
        (worker, metadata_store, hash_store)
    }

    #[tokio::test]
    async fn old_entry_without_later_coverage_is_kept() {
        let (worker, metadata_store, _hash_store) = worker(0).await;
        let old = entry("old", 1, 1, -1_000_000, -999_970);
        metadata_store.upsert(old).await.unwrap();

        let reclaimed = worker.reclaim_once().await.unwrap();
        assert_eq!(reclaimed, 0);
        assert_eq!(metadata_store.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn old_entry_with_covering_successor_is_reclaimed() {
        let (worker, metadata_store, hash_store) = worker(0).await;
        let now = Utc::now().timestamp();
        let old = entry("old", 1, 1, now - 1_000_000, now - 999_970);
        let newer = entry("new", 1, 2, now - 999_970, now + 1_000_000);
        metadata_store.upsert(old.clone()).await.unwrap();
        metadata_store.upsert(newer).await.unwrap();
        hash_store.insert(&old.key).await.unwrap();

        let reclaimed = worker.reclaim_once().await.unwrap();
        assert_eq!(reclaimed, 1);
        let remaining = metadata_store.entries().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].key, "new");
        assert!(!hash_store.contains("old").await.unwrap());
    }
}
