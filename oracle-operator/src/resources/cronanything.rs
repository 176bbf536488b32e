//! The generic, resource-kind-agnostic scheduled-resource CRD.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How to behave when a prior child has not reached a terminal state at the
/// next trigger instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ConcurrencyPolicy {
    /// Materialise every pending trigger regardless of in-flight children.
    #[default]
    Allow,
    /// Skip all pending triggers while any child is non-terminal.
    Forbid,
    /// Delete non-terminal children (foreground propagation) and materialise
    /// only the most recent pending trigger.
    Replace,
}

/// Count/age-based retention applied to terminal children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    /// Keep at most this many of the most recent successful children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_limit: Option<u32>,
    /// Keep at most this many of the most recent failed children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_limit: Option<u32>,
}

/// An opaque, schema-unvalidated child resource template: a group/version/kind
/// triple plus the raw JSON to clone when materialising a child. The template
/// is deliberately untyped here — schema validation is delegated to the
/// platform API server at child creation time.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChildTemplate {
    /// API group of the child kind.
    pub group: String,
    /// API version of the child kind.
    pub version: String,
    /// Kind name of the child resource.
    pub kind: String,
    /// The child's `metadata.name`/`metadata.namespace` are controller-owned
    /// and ignored if present here; everything else is cloned verbatim.
    pub spec: serde_json::Value,
}

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "oracle.db.anthosapis.com",
    version = "v1alpha1",
    kind = "CronAnything",
    plural = "cronanythings",
    shortname = "ca",
    status = "CronAnythingStatus",
    namespaced,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"Suspend","type":"boolean","jsonPath":".spec.suspend"}"#,
    printcolumn = r#"{"name":"Last Schedule","type":"date","jsonPath":".status.lastScheduleTime"}"#
)]
#[serde(rename_all = "camelCase")]
/// Desired state: a schedule, a child template, and the policies governing
/// concurrency and retention of materialised children.
pub struct CronAnythingSpec {
    /// Standard 5-field cron expression, evaluated in UTC.
    pub schedule: String,
    /// The child resource template to materialise at each trigger.
    pub template: ChildTemplate,
    /// Maximum lateness tolerated before a missed trigger is dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_deadline_seconds: Option<i64>,
    /// How to behave when a prior child has not reached a terminal state.
    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,
    /// When true, the controller materialises no children.
    #[serde(default)]
    pub suspend: bool,
    /// JSONPath into a child identifying its terminal-state field (e.g.
    /// `.status.phase`). Absent means every child is always non-terminal,
    /// which degenerates `Forbid`/`Replace` to always-skip/always-replace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishable_by: Option<String>,
    /// The set of values `finishable_by` takes on when a child is terminal.
    #[serde(default)]
    pub terminal_values: Vec<String>,
    /// Count-based retention applied to terminal children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionPolicy>,
    /// Caps total (terminal + non-terminal) materialised children,
    /// preferring to delete terminal ones first, oldest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
/// Observed state: the last accounted-for trigger, conditions, and a count
/// of currently materialised children.
pub struct CronAnythingStatus {
    /// The latest trigger instant that has been materialised or accounted for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_schedule_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Standard Kubernetes conditions (`Ready`, etc).
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Number of children currently materialised, for quick `kubectl get`
    /// visibility; the `createdBy` label selector remains the source of truth.
    #[serde(default)]
    pub active_children: i32,
}
