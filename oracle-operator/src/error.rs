//! Per-module error taxonomies, matching the transient/validation/policy-skip
//! partitioning the reconcilers use to decide requeue behavior.

use thiserror::Error;

/// Why a trigger or reconcile pass was intentionally skipped (not an error).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// A non-terminal child already exists and `concurrencyPolicy: Forbid` applies.
    ConcurrencyForbid,
    /// An older simultaneous trigger was coalesced into the newest one by `concurrencyPolicy: Replace`.
    CoalescedByReplace,
    /// The trigger was older than `triggerDeadline` tolerates.
    MissedDeadline,
}

impl SkipReason {
    /// The condition-reason string recorded alongside the skip.
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::ConcurrencyForbid => "ConcurrencyForbid",
            SkipReason::CoalescedByReplace => "CoalescedByReplace",
            SkipReason::MissedDeadline => "MissedDeadline",
        }
    }
}

/// Errors from the CronAnything controller.
#[derive(Debug, Error)]
pub enum CronAnythingError {
    /// Transient Kubernetes API error; requeue with backoff.
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    /// `spec.schedule` failed to parse; terminal until the spec changes.
    #[error("invalid cron schedule: {0}")]
    InvalidSchedule(#[from] crate::cron::ParseError),
    /// The template's child kind is not yet known to the discovery cache.
    #[error("child kind {group}/{version} {kind} could not be resolved via discovery")]
    DiscoveryUnresolved {
        /// API group of the unresolved child kind.
        group: String,
        /// API version of the unresolved child kind.
        version: String,
        /// Kind name of the unresolved child kind.
        kind: String,
    },
    /// The rendered child failed to deserialize as a valid object.
    #[error("template invalid: {0}")]
    TemplateInvalid(String),
    /// A child with the derived name exists but lacks the `createdBy` label.
    #[error("child name {name:?} exists but is not owned by this CronAnything")]
    NameConflict {
        /// The conflicting child's name.
        name: String,
    },
    /// `finishableBy` is not a valid JSONPath expression.
    #[error("invalid finishableBy JSONPath {path:?}: {reason}")]
    InvalidJsonPath {
        /// The configured JSONPath expression.
        path: String,
        /// The parser's rejection reason.
        reason: String,
    },
    /// The object being reconciled has no name set.
    #[error("object has no name")]
    UnnamedObject,
}

/// Errors from the BackupSchedule controller.
#[derive(Debug, Error)]
pub enum BackupScheduleError {
    /// Transient Kubernetes API error; requeue with backoff.
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    /// `spec.schedule` failed to parse; terminal until the spec changes.
    #[error("invalid cron schedule: {0}")]
    InvalidSchedule(#[from] crate::cron::ParseError),
    /// The owned CronAnything could not be created or patched after retries.
    #[error("owned CronAnything {name:?} could not be created or patched: {source}")]
    DegradedScheduler {
        /// Name of the owned CronAnything.
        name: String,
        /// Underlying Kubernetes API error.
        source: kube::Error,
    },
    /// The object being reconciled has no name set.
    #[error("object has no name")]
    UnnamedObject,
    /// `spec.backupSpec` failed to serialize into the CronAnything template.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors surfaced by the PITR engine's workers and status API.
#[derive(Debug, Error)]
pub enum PitrError {
    /// Underlying object-store operation failed.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    /// The data-plane agent RPC returned an error.
    #[error("database agent rpc failed: {0}")]
    Agent(String),
    /// The MetadataStore's compare-and-swap loop exhausted its retry budget.
    #[error("metadata store version conflict after {attempts} retries")]
    MetadataConflict {
        /// Number of compare-and-swap attempts made.
        attempts: u32,
    },
    /// The MetadataStore document failed to parse.
    #[error("metadata store document corrupt: {0}")]
    CorruptMetadata(String),
    /// `spec.storageURI` does not begin with `gs://`.
    #[error("storageURI {0:?} must begin with gs://")]
    InvalidStorageUri(String),
    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
