//! CRD type definitions for the scheduling and PITR control plane.

/// The `Backup` custom resource.
pub mod backup;
/// The `BackupSchedule` custom resource.
pub mod backupschedule;
/// The `CronAnything` custom resource.
pub mod cronanything;
/// The `Pitr` custom resource.
pub mod pitr;

pub use backup::{Backup, BackupPhase, BackupSpec, BackupStatus};
pub use backupschedule::{BackupSchedule, BackupSchedulePhase, BackupScheduleSpec, BackupScheduleStatus};
pub use cronanything::{ConcurrencyPolicy, CronAnything, CronAnythingSpec, CronAnythingStatus};
pub use pitr::{Pitr, PitrPhase, PitrSpec, PitrStatus, RecoveryWindow};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;

/// Inserts or replaces a condition by `type_`, keeping the list small and
/// deterministic the way `kube`-based controllers conventionally do.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        if existing.status != condition.status {
            existing.last_transition_time = condition.last_transition_time;
        }
        existing.status = condition.status;
        existing.reason = condition.reason;
        existing.message = condition.message;
        existing.observed_generation = condition.observed_generation;
    } else {
        conditions.push(condition);
    }
}

/// Label applied to every child materialised by a CronAnything, tying it
/// back to its parent for listing.
pub const CREATED_BY_LABEL: &str = "cronanything.oracle.db.anthosapis.com/createdBy";

/// Annotation recording the trigger instant (RFC3339) a child was
/// materialised for, distinct from its wall-clock creation timestamp.
pub const SCHEDULE_TIME_ANNOTATION: &str = "cronanything.oracle.db.anthosapis.com/scheduleTime";
