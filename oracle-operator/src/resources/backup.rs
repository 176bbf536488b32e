//! The `Backup` child resource materialised by a BackupSchedule/CronAnything.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
/// Lifecycle phase of a single `Backup` execution.
pub enum BackupPhase {
    /// Accepted but not yet started.
    #[default]
    Pending,
    /// The external backup controller is executing it.
    InProgress,
    /// Completed successfully.
    Succeeded,
    /// Completed unsuccessfully.
    Failed,
}

impl BackupPhase {
    /// Whether this phase is a terminal (finished) state.
    pub fn is_terminal(self) -> bool {
        matches!(self, BackupPhase::Succeeded | BackupPhase::Failed)
    }
}

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "oracle.db.anthosapis.com",
    version = "v1alpha1",
    kind = "Backup",
    plural = "backups",
    shortname = "ob",
    status = "BackupStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
/// Desired state of a single backup execution.
pub struct BackupSpec {
    /// Name of the Instance (or database) this backup targets.
    pub instance_ref: String,
    /// Backup mechanism, e.g. `Physical` or `Snapshot`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_type: Option<String>,
    /// Backup subtype, e.g. `Instant`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// GCS directory the backup artifact is written under, if any.
    #[serde(default)]
    pub gcs_dir: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Observed state of a single backup execution.
pub struct BackupStatus {
    /// Current lifecycle phase.
    #[serde(default)]
    pub phase: BackupPhase,
    /// Standard Kubernetes conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
