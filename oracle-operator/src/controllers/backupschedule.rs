//! The BackupSchedule reconciler: synthesises and owns a CronAnything whose
//! children are `Backup` objects, then separately prunes Backup history
//! against its own retention count (independent of the generic engine's
//! retention knobs, which this CronAnything leaves unset).

use crate::{
    controllers::cronanything::{RetentionClassifier, TerminalClass},
    cron::Schedule,
    error::BackupScheduleError as Error,
    resources::{
        backup::{Backup, BackupPhase},
        cronanything::{ChildTemplate, ConcurrencyPolicy, CronAnythingSpec},
        set_condition, BackupSchedule, CronAnything, CREATED_BY_LABEL, SCHEDULE_TIME_ANNOTATION,
    },
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::{
    api::{Api, DeleteParams, Patch, PatchParams, Preconditions, PropagationPolicy, ResourceExt},
    runtime::controller::{Action, Context},
    Resource,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Classifies a `Backup`'s `status.phase` string (the `finishableBy` value)
/// into success/failure for the generic retention engine, for the rare case
/// a CronAnything targets `Backup` directly rather than through a
/// BackupSchedule.
pub struct BackupPhaseClassifier;

impl RetentionClassifier for BackupPhaseClassifier {
    fn classify(&self, finishable_value: &str) -> TerminalClass {
        match finishable_value {
            "Succeeded" => TerminalClass::Successful,
            _ => TerminalClass::Failed,
        }
    }
}

/// Shared dependencies threaded through every BackupSchedule reconcile.
pub struct BackupScheduleContext {
    /// Kubernetes client used for all API calls.
    pub client: kube::Client,
    /// Default requeue interval after a transient error.
    pub base_requeue: Duration,
}

/// The CronAnything this BackupSchedule owns is named identically, making
/// the 1:1 relationship a simple name lookup.
fn owned_cronanything_name(backup_schedule_name: &str) -> String {
    backup_schedule_name.to_string()
}

fn desired_cronanything_spec(backup_schedule: &BackupSchedule) -> Result<CronAnythingSpec, Error> {
    // Validate the schedule eagerly so a bad expression surfaces on the
    // BackupSchedule itself rather than only once projected onto the child.
    Schedule::parse(&backup_schedule.spec.schedule)?;

    let spec_json = serde_json::to_value(&backup_schedule.spec.backup_spec)?;

    let child_template_body = serde_json::json!({
        "apiVersion": format!("{}/{}", Backup::group(&()), Backup::version(&())),
        "kind": Backup::kind(&()).into_owned(),
        "spec": spec_json,
    });

    Ok(CronAnythingSpec {
        schedule: backup_schedule.spec.schedule.clone(),
        template: ChildTemplate {
            group: Backup::group(&()).into_owned(),
            version: Backup::version(&()).into_owned(),
            kind: Backup::kind(&()).into_owned(),
            spec: child_template_body,
        },
        trigger_deadline_seconds: backup_schedule.spec.starting_deadline_seconds,
        concurrency_policy: ConcurrencyPolicy::Forbid,
        suspend: backup_schedule.spec.suspend,
        finishable_by: Some(".status.phase".to_string()),
        terminal_values: vec!["Succeeded".to_string(), "Failed".to_string()],
        retention: None,
        history_limit: None,
    })
}

/// Synthesises/updates the owned CronAnything, prunes Backup retention, and
/// patches `status`.
pub async fn reconcile(
    backup_schedule: Arc<BackupSchedule>,
    ctx: Context<BackupScheduleContext>,
) -> Result<Action, Error> {
    let ctx = ctx.get_ref();
    let name = backup_schedule.name_any();
    if name.is_empty() {
        return Err(Error::UnnamedObject);
    }
    let ns = backup_schedule.namespace().unwrap_or_default();

    let cron_api: Api<CronAnything> = Api::namespaced(ctx.client.clone(), &ns);
    let owned_name = owned_cronanything_name(&name);
    let desired_spec = desired_cronanything_spec(&backup_schedule)?;

    match cron_api.get_opt(&owned_name).await? {
        None => {
            let mut cron_anything = CronAnything::new(&owned_name, desired_spec);
            cron_anything.meta_mut().namespace = Some(ns.clone());
            if let Some(owner_ref) = backup_schedule.controller_owner_ref(&()) {
                cron_anything.meta_mut().owner_references = Some(vec![owner_ref]);
            }
            cron_api
                .create(&kube::api::PostParams::default(), &cron_anything)
                .await
                .map_err(|e| Error::DegradedScheduler {
                    name: owned_name.clone(),
                    source: e,
                })?;
        }
        Some(existing) => {
            if existing.spec != desired_spec {
                let patch = serde_json::json!({ "spec": desired_spec });
                cron_api
                    .patch(&owned_name, &PatchParams::default(), &Patch::Merge(patch))
                    .await
                    .map_err(|e| Error::DegradedScheduler {
                        name: owned_name.clone(),
                        source: e,
                    })?;
            }
        }
    }

    let backups_api: Api<Backup> = Api::namespaced(ctx.client.clone(), &ns);
    let selector = format!("{CREATED_BY_LABEL}={owned_name}");
    let backups = backups_api
        .list(&kube::api::ListParams::default().labels(&selector))
        .await?;

    let mut succeeded: Vec<_> = backups
        .items
        .iter()
        .filter(|b| b.status.as_ref().map(|s| s.phase) == Some(BackupPhase::Succeeded))
        .collect();
    succeeded.sort_by_key(|b| {
        b.annotations()
            .get(SCHEDULE_TIME_ANNOTATION)
            .cloned()
            .unwrap_or_default()
    });

    let limit = backup_schedule
        .spec
        .backup_retention_policy
        .as_ref()
        .and_then(|p| p.backup_retention)
        .map(|n| n as usize);
    if let Some(limit) = limit {
        if succeeded.len() > limit {
            let excess = succeeded.len() - limit;
            for backup in succeeded.iter().take(excess) {
                let dp = DeleteParams {
                    propagation_policy: Some(PropagationPolicy::Foreground),
                    preconditions: Some(Preconditions {
                        uid: backup.uid(),
                        resource_version: None,
                    }),
                    ..Default::default()
                };
                match backups_api.delete(&backup.name_any(), &dp).await {
                    Ok(_) => {}
                    Err(kube::Error::Api(resp)) if resp.code == 404 => {}
                    Err(e) => return Err(Error::Kube(e)),
                }
            }
        }
    }

    let mut history: Vec<String> = succeeded.iter().rev().map(|b| b.name_any()).collect();
    history.truncate(10);

    let mut status = backup_schedule.status.clone().unwrap_or_default();
    status.last_backup_time = succeeded.last().and_then(|b| {
        b.annotations()
            .get(SCHEDULE_TIME_ANNOTATION)
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&chrono::Utc))
    });
    status.backup_history = history;
    set_condition(&mut status.conditions, ready_condition());

    let status_patch = serde_json::json!({ "status": status });
    let backup_schedule_api: Api<BackupSchedule> = Api::namespaced(ctx.client.clone(), &ns);
    backup_schedule_api
        .patch_status(&name, &PatchParams::default(), &Patch::Merge(status_patch))
        .await?;

    Ok(Action::requeue(ctx.base_requeue.max(Duration::from_secs(30))))
}

fn ready_condition() -> Condition {
    Condition {
        type_: "Ready".to_string(),
        status: "True".to_string(),
        reason: "ReconcileSucceeded".to_string(),
        message: "owned CronAnything is up to date".to_string(),
        observed_generation: None,
        last_transition_time: Time(chrono::Utc::now()),
    }
}

/// Requeues with backoff on any error; BackupSchedule has no terminal error class.
pub fn error_policy(error: &Error, ctx: Context<BackupScheduleContext>) -> Action {
    warn!(%error, "backupschedule reconcile failed, requeuing with backoff");
    Action::requeue(ctx.get_ref().base_requeue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_name_matches_parent() {
        assert_eq!(owned_cronanything_name("nightly"), "nightly");
    }
}
