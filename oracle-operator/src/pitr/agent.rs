//! Data-plane RPC traits consumed by the PITR engine (§6): opaque to the
//! core beyond the handful of calls the engine itself makes. A real
//! implementation is a thin gRPC wrapper an operator binary supplies (not
//! wired up here — the transport itself is out of scope, per §1's "Oracle
//! data-plane agents... specified only by the RPCs the core consumes");
//! the in-memory mocks in [`mock`] drive the worker test suite.

use crate::error::PitrError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A single archived redo log as surfaced by `DatabaseDaemon.ListArchivedLogs`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArchivedLog {
    /// Redo thread number.
    pub thread: u32,
    /// Log sequence number within the thread.
    pub sequence: u64,
}

/// Rich per-log metadata (sequence/thread/incarnation/SCN/time), fetched
/// lazily per §4.4.2 rather than eagerly on every `ListArchivedLogs` call.
#[derive(Clone, Debug, PartialEq)]
pub struct LogMetadata {
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
}

/// The subset of `DatabaseDaemon`'s RPC surface the PITR engine calls:
/// `RunSQLPlus`/`RunSQLPlusFormatted` (opaque; used only to set the
/// archive-lag parameter at startup), plus log listing/reading/metadata
/// lookups used by the replication and metadata-update workers.
#[async_trait]
pub trait DatabaseDaemonClient: Send + Sync {
    /// Sets the archive-lag-target equivalent so logs rotate at most
    /// `seconds` behind real time (§4.4.1).
    async fn set_archive_lag_target(&self, seconds: u32) -> Result<(), PitrError>;
    /// Lists archived logs currently present on the database host.
    async fn list_archived_logs(&self) -> Result<Vec<ArchivedLog>, PitrError>;
    /// Streams the full contents of one archived log.
    async fn read_archived_log(&self, log: &ArchivedLog) -> Result<Bytes, PitrError>;
    /// Fetches sequence/thread/incarnation/SCN/time metadata for one log.
    async fn archived_log_metadata(&self, log: &ArchivedLog) -> Result<LogMetadata, PitrError>;
}

/// The PITR status read API (§4.4.5), modelled as a trait so that the
/// Instance controller's consumption of it (out of scope here) has a
/// well-defined seam; [`crate::pitr::engine::Engine`] implements it
/// directly against its own in-memory/MetadataStore-derived state.
#[async_trait]
pub trait PitrAgentClient: Send + Sync {
    /// Returns the currently recoverable time windows.
    async fn status(&self) -> Result<Vec<crate::resources::RecoveryWindow>, PitrError>;
}

/// Placeholder real implementation: the gRPC transport to `dbdaemon` is not
/// part of this core (§1 Out of scope). Every call fails with
/// [`PitrError::Agent`] so a misconfigured deployment degrades visibly
/// (surfaced via the `Degraded` condition) rather than silently no-opping.
pub struct UnimplementedDatabaseDaemonClient {
    /// The configured agent image, surfaced in the error message.
    pub agent_image: Option<String>,
}

#[async_trait]
impl DatabaseDaemonClient for UnimplementedDatabaseDaemonClient {
    async fn set_archive_lag_target(&self, _seconds: u32) -> Result<(), PitrError> {
        Err(self.unwired())
    }

    async fn list_archived_logs(&self) -> Result<Vec<ArchivedLog>, PitrError> {
        Err(self.unwired())
    }

    async fn read_archived_log(&self, _log: &ArchivedLog) -> Result<Bytes, PitrError> {
        Err(self.unwired())
    }

    async fn archived_log_metadata(&self, _log: &ArchivedLog) -> Result<LogMetadata, PitrError> {
        Err(self.unwired())
    }
}

impl UnimplementedDatabaseDaemonClient {
    fn unwired(&self) -> PitrError {
        PitrError::Agent(format!(
            "no dbdaemon transport configured for agent image {:?}",
            self.agent_image
        ))
    }
}

#[cfg(test)]
/// In-memory test doubles for the data-plane client traits.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// In-memory [`DatabaseDaemonClient`] backed by a fixed log catalogue,
    /// used throughout the PITR worker test suite (§8.1).
    pub struct MockDatabaseDaemonClient {
        logs: Vec<(ArchivedLog, Bytes, LogMetadata)>,
        /// Every `seconds` value passed to `set_archive_lag_target`, in call order.
        pub lag_target_calls: Mutex<Vec<u32>>,
    }

    impl MockDatabaseDaemonClient {
        /// Builds a mock backed by a fixed catalogue of `(log, contents, metadata)`.
        pub fn new(logs: Vec<(ArchivedLog, Bytes, LogMetadata)>) -> Self {
            MockDatabaseDaemonClient {
                logs,
                lag_target_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DatabaseDaemonClient for MockDatabaseDaemonClient {
        async fn set_archive_lag_target(&self, seconds: u32) -> Result<(), PitrError> {
            self.lag_target_calls.lock().unwrap().push(seconds);
            Ok(())
        }

        async fn list_archived_logs(&self) -> Result<Vec<ArchivedLog>, PitrError> {
            Ok(self.logs.iter().map(|(l, _, _)| l.clone()).collect())
        }

        async fn read_archived_log(&self, log: &ArchivedLog) -> Result<Bytes, PitrError> {
            self.logs
                .iter()
                .find(|(l, _, _)| l == log)
                .map(|(_, contents, _)| contents.clone())
                .ok_or_else(|| PitrError::Agent(format!("unknown log {log:?}")))
        }

        async fn archived_log_metadata(&self, log: &ArchivedLog) -> Result<LogMetadata, PitrError> {
            self.logs
                .iter()
                .find(|(l, _, _)| l == log)
                .map(|(_, _, meta)| meta.clone())
                .ok_or_else(|| PitrError::Agent(format!("unknown log {log:?}")))
        }
    }

    /// In-memory [`PitrAgentClient`] returning a fixed window list, for
    /// tests of consumers of the status API.
    pub struct MockPitrAgentClient {
        /// The fixed window list `status()` returns.
        pub windows: Vec<crate::resources::RecoveryWindow>,
    }

    #[async_trait]
    impl PitrAgentClient for MockPitrAgentClient {
        async fn status(&self) -> Result<Vec<crate::resources::RecoveryWindow>, PitrError> {
            Ok(self.windows.clone())
        }
    }
}
