//! Metadata Update Worker (§4.4.2): periodically diffs
//! `HashStore \ MetadataStore.keys` and, for each newly-shipped key, fetches
//! rich per-log metadata (sequence/thread/incarnation/SCN/time) from the
//! database agent and appends a [`LogEntry`] to the MetadataStore under its
//! compare-and-swap discipline.
//!
//! There's no direct index from a content hash back to the `ArchivedLog`
//! identity the agent needs for the metadata lookup, so each pass re-lists
//! and re-hashes the agent's current archived logs to recover the
//! correlation — acceptable since this runs at a slower cadence than
//! replication and the agent's log list is small.

use crate::pitr::{
    agent::DatabaseDaemonClient,
    hash_store::hash_contents,
    metadata_store::{LogEntry, MetadataStore},
    state::EngineState,
};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Enriches shipped-but-undocumented logs with SCN/time metadata from the agent.
pub struct MetadataWorker {
    /// Data-plane agent client.
    pub agent: Arc<dyn DatabaseDaemonClient>,
    /// The `LogEntry` index this worker appends to.
    pub metadata_store: Arc<MetadataStore>,
    /// Shared engine lifecycle state.
    pub state: Arc<EngineState>,
    /// How often to run an update pass.
    pub poll_interval: Duration,
}

impl MetadataWorker {
    /// Fetches metadata for every shipped-but-undocumented log; returns the
    /// count newly recorded.
    pub async fn update_once(&self, shipped_keys: &HashSet<String>) -> Result<usize, crate::error::PitrError> {
        let known = self.metadata_store.keys().await?;
        let pending: HashSet<&String> = shipped_keys.difference(&known).collect();
        if pending.is_empty() {
            return Ok(0);
        }

        let logs = self.agent.list_archived_logs().await?;
        let mut recorded = 0;
        for log in logs {
            let contents = self.agent.read_archived_log(&log).await?;
            let key = hash_contents(&contents);
            if !pending.contains(&key) {
                continue;
            }

            let meta = self.agent.archived_log_metadata(&log).await?;
            self.metadata_store
                .upsert(LogEntry {
                    key: key.clone(),
                    thread: log.thread,
                    sequence: log.sequence,
                    incarnation: meta.incarnation,
                    first_change: meta.first_change,
                    next_change: meta.next_change,
                    first_time: meta.first_time,
                    next_time: meta.next_time,
                    size_bytes: contents.len() as u64,
                    object_path: format!("logs/{key}"),
                })
                .await?;
            recorded += 1;
        }
        Ok(recorded)
    }

    /// Runs update passes on `poll_interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, hash_store: Arc<crate::pitr::hash_store::HashStore>, cancel: CancellationToken) {
        loop {
            let shipped_keys = hash_store.keys().await;
            match self.update_once(&shipped_keys).await {
                Ok(count) => {
                    if count > 0 {
                        info!(recorded = count, "recorded metadata for newly shipped logs");
                    } else {
                        debug!("no pending metadata to record");
                    }
                    self.state.mark_healthy();
                }
                Err(e) => {
                    error!(error = %e, "metadata update pass failed");
                    self.state.mark_degraded(format!("metadata: {e}"));
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
    use crate::pitr::agent::{mock::MockDatabaseDaemonClient, ArchivedLog, LogMetadata};
    use bytes::Bytes;
    use chrono::Utc;
    use object_store::{memory::InMemory, path::Path};

    fn log_meta() -> LogMetadata {
        LogMetadata {
            incarnation: 2,
            first_change: 5000,
            next_change: 5100,
            first_time: Utc::now(),
            next_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn records_metadata_for_shipped_key() {
        let log = ArchivedLog { thread: 1, sequence: 7 };
        let contents = Bytes::from_static(b"archived log payload");
        let key = hash_contents(&contents);
        let agent = Arc::new(MockDatabaseDaemonClient::new(vec![(log, contents, log_meta())]));
        let metadata_store = Arc::new(MetadataStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod")));
        let worker = MetadataWorker {
            agent,
            metadata_store: metadata_store.clone(),
            state: Arc::new(EngineState::default()),
            poll_interval: Duration::from_secs(1),
        };

        let shipped: HashSet<String> = [key.clone()].into_iter().collect();
        let recorded = worker.update_once(&shipped).await.unwrap();
        assert_eq!(recorded, 1);

        let entries = metadata_store.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, key);
        assert_eq!(entries[0].incarnation, 2);
    }

    #[tokio::test]
    async fn already_recorded_keys_are_skipped() {
        let log = ArchivedLog { thread: 1, sequence: 7 };
        let contents = Bytes::from_static(b"archived log payload");
        let key = hash_contents(&contents);
        let agent = Arc::new(MockDatabaseDaemonClient::new(vec![(log, contents, log_meta())]));
        let metadata_store = Arc::new(MetadataStore::new(Arc::new(InMemory::new()), &Path::from("pitr/prod")));
        let worker = MetadataWorker {
            agent,
            metadata_store: metadata_store.clone(),
            state: Arc::new(EngineState::default()),
            poll_interval: Duration::from_secs(1),
        };

        let shipped: HashSet<String> = [key].into_iter().collect();
        worker.update_once(&shipped).await.unwrap();
        let recorded_again = worker.update_once(&shipped).await.unwrap();
        assert_eq!(recorded_again, 0);
    }
}
