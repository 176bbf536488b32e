//! Log Replication Worker (§4.4.1): polls `DatabaseDaemon.ListArchivedLogs`,
//! ships any log not already present in the [`HashStore`] to the object
//! store, then commits the HashStore marker. The HashStore write is the
//! commit point — an interrupted upload leaves an orphan object that the
//! sweeper (§4.4.3.1) reclaims, rather than something this worker has to
//! clean up itself.
//!
//! Rich metadata (sequence/thread/incarnation/SCN/time) is deliberately not
//! fetched here; the Metadata Update Worker (§4.4.2) does that on its own,
//! slower cadence against the `HashStore \ MetadataStore.keys` diff.

use crate::{
    error::PitrError,
    pitr::{
        agent::DatabaseDaemonClient,
        hash_store::{hash_contents, HashStore},
        state::EngineState,
    },
};
use backoff::{future::retry, Error as BackoffError, ExponentialBackoff};
use object_store::{path::Path, ObjectStore};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Backpressure policy for the object-store upload (§4.4.1: "if the object
/// store returns rate-limit errors, exponential backoff up to a cap; never
/// drop"). `max_elapsed_time: None` is the "never drop" half of that; the
/// cap is `max_interval`, not a total deadline.
fn upload_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        max_interval: Duration::from_secs(30),
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

/// Ships archived logs not already present in the `HashStore` to object storage.
pub struct ReplicationWorker {
    /// Data-plane agent client.
    pub agent: Arc<dyn DatabaseDaemonClient>,
    /// Backing object store.
    pub store: Arc<dyn ObjectStore>,
    /// PITR instance's root path under `storageURI`.
    pub logs_root: Path,
    /// The content-addressed dedup index.
    pub hash_store: Arc<HashStore>,
    /// Shared engine lifecycle state.
    pub state: Arc<EngineState>,
    /// How often to run a replication pass.
    pub poll_interval: Duration,
    /// Target archive-lag parameter set on the database at startup.
    pub archive_lag_target_seconds: u32,
}

impl ReplicationWorker {
    /// Ships every archived log whose content hash isn't already in the
    /// `HashStore`; returns the count shipped. Pulled out of `run` so tests
    /// can drive a single pass without the poll loop.
    pub async fn replicate_once(&self) -> Result<usize, crate::error::PitrError> {
        let logs = self.agent.list_archived_logs().await?;
        let mut shipped = 0;
        for log in logs {
            let contents = self.agent.read_archived_log(&log).await?;
            let key = hash_contents(&contents);
            if self.hash_store.contains(&key).await? {
                continue;
            }

            let object_path = self.logs_root.child("logs").child(key.as_str());
            retry(upload_backoff(), || async {
                self.store.put(&object_path, contents.clone().into()).await.map_err(|e| {
                    warn!(error = %e, key = %key, "object store put failed, backing off and retrying");
                    BackoffError::transient(PitrError::from(e))
                })
            })
            .await?;
            self.hash_store.insert(&key).await?;
            shipped += 1;
        }
        Ok(shipped)
    }

    /// Sets the archive-lag target, then runs replication passes on
    /// `poll_interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if let Err(e) = self.agent.set_archive_lag_target(self.archive_lag_target_seconds).await {
            warn!(error = %e, "failed to set archive lag target, continuing with database default");
        }

        loop {
            match self.replicate_once().await {
                Ok(count) => {
                    if count > 0 {
                        info!(shipped = count, "replicated archived logs");
                    } else {
                        debug!("no new archived logs");
                    }
                    self.state.mark_healthy();
                    self.state.mark_bootstrapped();
                }
                Err(e) => {
                    error!(error = %e, "log replication pass failed");
                    self.state.mark_degraded(format!("replication: {e}"));
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
    use object_store::memory::InMemory;

    fn worker(logs: Vec<(ArchivedLog, Bytes, LogMetadata)>) -> ReplicationWorker {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let root = Path::from("pitr/prod");
        ReplicationWorker {
            agent: Arc::new(MockDatabaseDaemonClient::new(logs)),
            hash_store: Arc::new(HashStore::new(store.clone(), &root)),
            store,
            logs_root: root,
            state: Arc::new(EngineState::default()),
            poll_interval: Duration::from_secs(1),
            archive_lag_target_seconds: 0,
        }
    }

    fn log_meta() -> LogMetadata {
        LogMetadata {
            incarnation: 1,
            first_change: 1000,
            next_change: 1030,
            first_time: Utc::now(),
            next_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ships_new_logs_into_hash_store() {
        let log = ArchivedLog { thread: 1, sequence: 1 };
        let w = worker(vec![(log, Bytes::from_static(b"log bytes"), log_meta())]);

        let shipped = w.replicate_once().await.unwrap();
        assert_eq!(shipped, 1);
        assert_eq!(w.hash_store.keys().await.len(), 1);
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let log = ArchivedLog { thread: 1, sequence: 1 };
        let w = worker(vec![(log, Bytes::from_static(b"log bytes"), log_meta())]);

        w.replicate_once().await.unwrap();
        let shipped_again = w.replicate_once().await.unwrap();
        assert_eq!(shipped_again, 0);
    }

    #[tokio::test]
    async fn marks_engine_healthy_and_bootstrapped_on_success() {
        let log = ArchivedLog { thread: 1, sequence: 1 };
        let w = Arc::new(worker(vec![(log, Bytes::from_static(b"log bytes"), log_meta())]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        w.clone().run(cancel).await;
        assert_eq!(w.state.phase(), crate::pitr::state::Phase::Replicating);
    }
}
