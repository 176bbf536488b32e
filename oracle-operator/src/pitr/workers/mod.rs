//! The PITR engine's long-running background workers (§4.4.1-§4.4.3,
//! §4.4.3.1, §4.4.6): each runs its own poll loop against a shared
//! [`crate::pitr::state::EngineState`] and object store handles, cooperatively
//! cancelled via a [`tokio_util::sync::CancellationToken`] at shutdown.

/// Metadata Update Worker (§4.4.2).
pub mod metadata;
/// Log Replication Worker (§4.4.1).
pub mod replication;
/// Log Retention Worker (§4.4.3).
pub mod retention;
/// Status condition ticker (§4.4.6).
pub mod status;
/// Orphan sweeper (§4.4.3.1).
pub mod sweeper;
