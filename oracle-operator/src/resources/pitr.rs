//! The `Pitr` CRD: declares an instance's point-in-time-recovery retention
//! and storage, and surfaces the currently recoverable time windows.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Reference to the Instance a `Pitr` resource tracks.
pub struct InstanceRef {
    /// Name of the referenced Instance, in the same namespace.
    pub name: String,
}

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "oracle.db.anthosapis.com",
    version = "v1alpha1",
    kind = "Pitr",
    plural = "pitrs",
    shortname = "pitr",
    status = "PitrStatus",
    namespaced,
    printcolumn = r#"{"name":"Instance","type":"string","jsonPath":".spec.instanceRef.name"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
/// Desired state of point-in-time-recovery log shipping for an instance.
pub struct PitrSpec {
    /// The Instance this PITR resource tracks.
    pub instance_ref: InstanceRef,
    /// Must begin with `gs://`.
    pub storage_uri: String,
    /// How long shipped logs are retained before garbage collection.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Container images used by the PITR sidecar/agent.
    #[serde(default)]
    pub images: PitrImages,
    /// Maximum acceptable lag between the newest committed change and the
    /// newest shipped archive log.
    #[serde(default = "default_archive_lag_seconds")]
    pub archive_lag_seconds: u32,
    /// Consecutive-failure duration after which the engine reports
    /// `Degraded` rather than `Replicating`.
    #[serde(default = "default_degraded_threshold_seconds")]
    pub degraded_threshold_seconds: u32,
}

fn default_retention_days() -> u32 {
    7
}

fn default_archive_lag_seconds() -> u32 {
    300
}

fn default_degraded_threshold_seconds() -> u32 {
    300
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Container images used by the PITR data-plane components.
pub struct PitrImages {
    /// Image reference for the database data-plane agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// The PITR engine's lifecycle state (§4.4 state machine).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PitrPhase {
    /// Not yet completed a first successful parameter-set and upload.
    #[default]
    Bootstrapping,
    /// Shipping logs normally.
    Replicating,
    /// Persistent upload/RPC failures exceeding the degraded threshold.
    Degraded,
    /// The resource was deleted; workers are draining.
    Terminating,
}

/// A closed recoverable time interval, `[begin, end]` inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryWindow {
    /// Start of the recoverable interval, inclusive.
    pub begin: chrono::DateTime<chrono::Utc>,
    /// End of the recoverable interval, inclusive.
    pub end: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Observed state: lifecycle phase, recoverable windows, and conditions.
pub struct PitrStatus {
    /// Current lifecycle phase.
    #[serde(default)]
    pub phase: PitrPhase,
    /// Ascending, non-overlapping.
    #[serde(default)]
    pub available_recovery_windows: Vec<RecoveryWindow>,
    /// Timestamp of the most recent successful log upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_replication_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Standard Kubernetes conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
