//! The domain-facing `BackupSchedule` CRD: a BackupSchedule synthesises and
//! owns a `CronAnything` whose children are `Backup` resources.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Count-based retention applied to a BackupSchedule's Succeeded backups.
pub struct BackupRetentionPolicy {
    /// Keep at most this many Succeeded Backups; older ones are deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_retention: Option<u32>,
}

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "oracle.db.anthosapis.com",
    version = "v1alpha1",
    kind = "BackupSchedule",
    plural = "backupschedules",
    shortname = "bs",
    status = "BackupScheduleStatus",
    namespaced,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"Last Backup","type":"date","jsonPath":".status.lastBackupTime"}"#
)]
#[serde(rename_all = "camelCase")]
/// Desired state: a schedule and a `Backup` template to materialise from it.
pub struct BackupScheduleSpec {
    /// Standard 5-field cron expression, evaluated in UTC.
    pub schedule: String,
    /// Template cloned onto each materialised `Backup`.
    pub backup_spec: crate::resources::backup::BackupSpec,
    /// Maximum lateness tolerated before a missed trigger is dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_deadline_seconds: Option<i64>,
    /// Count-based retention applied to Succeeded backups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_retention_policy: Option<BackupRetentionPolicy>,
    /// When true, no new Backups are materialised.
    #[serde(default)]
    pub suspend: bool,
}

/// Coarse phase surfaced for `kubectl get`; derived from `conditions`, not
/// independently authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum BackupSchedulePhase {
    /// Reconciling normally.
    #[default]
    Active,
    /// `spec.suspend` is true.
    Suspended,
    /// The owned CronAnything could not be created or patched.
    Degraded,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Observed state: history of materialised backups and conditions.
pub struct BackupScheduleStatus {
    /// Schedule time of the most recent Succeeded backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Bounded to the 10 most recent entries, newest first.
    #[serde(default)]
    pub backup_history: Vec<String>,
    /// Standard Kubernetes conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
