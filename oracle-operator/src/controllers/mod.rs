//! Reconcilers: CronAnything (generic scheduler) and BackupSchedule (domain
//! wrapper over it).

/// The `BackupSchedule` reconciler.
pub mod backupschedule;
/// The generic `CronAnything` reconciler.
pub mod cronanything;
/// The process-wide group/version/kind discovery cache.
pub mod discovery;
/// The `Pitr` reconciler.
pub mod pitr;

use kube_runtime::controller::Action;
use std::time::Duration;

/// Shared backoff curve for transient-error requeues across both
/// controllers, matching the concurrency model's "exponential backoff, no
/// status change" rule.
pub(crate) fn transient_backoff(base: Duration, attempt: u32) -> Action {
    let capped_attempt = attempt.min(6);
    let factor = 1u32 << capped_attempt;
    Action::requeue(base.saturating_mul(factor))
}
