//! Ties the PITR workers (§4.4.1-§4.4.3, §4.4.3.1, §4.4.6) together into a
//! single per-`Pitr` unit with one lifetime: created once when the
//! reconciler first sees the object, torn down on deletion (§4.4.7).

use crate::{
    error::PitrError,
    pitr::{
        agent::{DatabaseDaemonClient, PitrAgentClient},
        hash_store::HashStore,
        metadata_store::MetadataStore,
        split_storage_uri,
        state::EngineState,
        window,
        workers::{metadata::MetadataWorker, replication::ReplicationWorker, retention::RetentionWorker, status::StatusTicker, sweeper::Sweeper},
        PitrRef,
    },
    resources::RecoveryWindow,
};
use async_trait::async_trait;
use object_store::{gcp::GoogleCloudStorageBuilder, ObjectStore};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Tuning knobs threaded from `PitrSpec` and the process-wide [`crate::config::Config`].
pub struct EngineConfig {
    /// `gs://bucket/prefix` root all objects are shipped under.
    pub storage_uri: String,
    /// How long shipped logs are retained before garbage collection.
    pub retention_days: u32,
    /// Maximum acceptable lag before logs are forced to rotate.
    pub archive_lag_seconds: u32,
    /// Poll interval for the replication worker.
    pub replication_interval: Duration,
    /// Poll interval for the metadata-enrichment worker.
    pub metadata_interval: Duration,
    /// Poll interval for the retention worker.
    pub retention_interval: Duration,
    /// Poll interval for the orphan sweeper.
    pub sweeper_interval: Duration,
    /// Minimum age of an orphaned object before the sweeper reclaims it.
    pub sweeper_grace_period: Duration,
    /// Interval at which the `Pitr` status condition is refreshed.
    pub status_interval: Duration,
    /// Maximum time to wait for workers to exit on shutdown.
    pub drain_grace_period: Duration,
}

/// Builds a real [`ObjectStore`] for a `gs://` storage URI; the only
/// production implementation, injected behind a factory so tests can supply
/// [`object_store::memory::InMemory`] instead.
pub trait ObjectStoreFactory: Send + Sync {
    /// Builds a store rooted at `bucket`.
    fn build(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, PitrError>;
}

/// Production [`ObjectStoreFactory`] backed by real GCS credentials from the environment.
pub struct GcsObjectStoreFactory;

impl ObjectStoreFactory for GcsObjectStoreFactory {
    fn build(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, PitrError> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(PitrError::ObjectStore)?;
        Ok(Arc::new(store))
    }
}

/// A single PITR instance's running worker set. Dropping without calling
/// [`Engine::shutdown`] leaves the workers running detached; reconcilers
/// should always route deletion through `shutdown`.
pub struct Engine {
    /// The engine's lifecycle phase, shared with every worker.
    pub state: Arc<EngineState>,
    /// The `LogEntry` index this engine's workers populate.
    pub metadata_store: Arc<MetadataStore>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Builds the object store, starts all five workers, and returns the
    /// running engine. Workers run until [`Engine::shutdown`] is called.
    pub fn start(
        pitr_ref: PitrRef,
        client: kube::Client,
        agent: Arc<dyn DatabaseDaemonClient>,
        store_factory: &dyn ObjectStoreFactory,
        config: EngineConfig,
    ) -> Result<Self, PitrError> {
        let (bucket, root) = split_storage_uri(&config.storage_uri)
            .ok_or_else(|| PitrError::InvalidStorageUri(config.storage_uri.clone()))?;
        let store = store_factory.build(bucket)?;

        let state = Arc::new(EngineState::default());
        let hash_store = Arc::new(HashStore::new(store.clone(), &root));
        let metadata_store = Arc::new(MetadataStore::new(store.clone(), &root));
        let cancel = CancellationToken::new();

        let replication = Arc::new(ReplicationWorker {
            agent: agent.clone(),
            store: store.clone(),
            logs_root: root.clone(),
            hash_store: hash_store.clone(),
            state: state.clone(),
            poll_interval: config.replication_interval,
            archive_lag_target_seconds: config.archive_lag_seconds,
        });
        let metadata = Arc::new(MetadataWorker {
            agent,
            metadata_store: metadata_store.clone(),
            state: state.clone(),
            poll_interval: config.metadata_interval,
        });
        let retention = Arc::new(RetentionWorker {
            store: store.clone(),
            logs_root: root.clone(),
            hash_store: hash_store.clone(),
            metadata_store: metadata_store.clone(),
            state: state.clone(),
            poll_interval: config.retention_interval,
            retention_days: config.retention_days,
        });
        let sweeper = Arc::new(Sweeper {
            store,
            logs_root: root,
            hash_store: hash_store.clone(),
            metadata_store: metadata_store.clone(),
            state: state.clone(),
            poll_interval: config.sweeper_interval,
            grace_period: config.sweeper_grace_period,
        });
        let status_ticker = Arc::new(StatusTicker {
            client,
            pitr_ref,
            metadata_store: metadata_store.clone(),
            state: state.clone(),
            interval: config.status_interval,
        });

        let handles = vec![
            tokio::spawn(replication.run(cancel.clone())),
            tokio::spawn(metadata.run(hash_store.clone(), cancel.clone())),
            tokio::spawn(retention.run(cancel.clone())),
            tokio::spawn(sweeper.run(cancel.clone())),
            tokio::spawn(status_ticker.run(cancel.clone())),
        ];

        Ok(Engine {
            state,
            metadata_store,
            cancel,
            handles,
        })
    }

    /// Cancels the shared token, then waits for every worker to exit,
    /// bounded by a grace period (§4.4.7). Workers that don't exit in time
    /// are left detached; their next action after the deadline is harmless
    /// since the object store and Kubernetes writes they perform are all
    /// idempotent.
    pub async fn shutdown(mut self, grace_period: Duration) {
        self.state.mark_terminating();
        self.cancel.cancel();

        let joined = tokio::time::timeout(grace_period, futures::future::join_all(self.handles.drain(..))).await;
        match joined {
            Ok(_) => info!("all PITR workers exited within grace period"),
            Err(_) => warn!(?grace_period, "PITR workers did not exit within grace period, abandoning"),
        }
    }
}

#[async_trait]
impl PitrAgentClient for Engine {
    async fn status(&self) -> Result<Vec<RecoveryWindow>, PitrError> {
        let entries = self.metadata_store.entries().await?;
        let windows = window::recovery_windows(&entries);
        Ok(windows
            .into_iter()
            .map(|w| RecoveryWindow {
                begin: w.begin_time,
                end: w.end_time,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitr::agent::mock::MockDatabaseDaemonClient;
    use object_store::memory::InMemory;

    struct InMemoryFactory(Arc<dyn ObjectStore>);

    impl ObjectStoreFactory for InMemoryFactory {
        fn build(&self, _bucket: &str) -> Result<Arc<dyn ObjectStore>, PitrError> {
            Ok(self.0.clone())
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            storage_uri: "gs://test-bucket/pitr/prod".to_string(),
            retention_days: 7,
            archive_lag_seconds: 300,
            replication_interval: Duration::from_millis(10),
            metadata_interval: Duration::from_millis(10),
            retention_interval: Duration::from_millis(10),
            sweeper_interval: Duration::from_millis(10),
            sweeper_grace_period: Duration::from_secs(3600),
            status_interval: Duration::from_millis(10),
            drain_grace_period: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn status_reflects_empty_metadata_store() {
        let factory = InMemoryFactory(Arc::new(InMemory::new()));
        let agent = Arc::new(MockDatabaseDaemonClient::new(Vec::new()));
        let engine = Engine::start(
            PitrRef {
                namespace: "db".to_string(),
                name: "prod".to_string(),
            },
            kube::Client::try_from(kube::Config::new("https://example.invalid".parse().unwrap())).unwrap(),
            agent,
            &factory,
            test_config(),
        )
        .unwrap();

        let windows = engine.status().await.unwrap();
        assert!(windows.is_empty());
        engine.shutdown(Duration::from_millis(200)).await;
    }
}
