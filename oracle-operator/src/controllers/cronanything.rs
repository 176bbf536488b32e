//! The generic CronAnything reconciler: materialises child resources from a
//! cron schedule + template, enforcing concurrency, retention and history
//! policies. See the reconcile algorithm in the module-level design notes.

use crate::{
    cron::Schedule,
    error::{CronAnythingError as Error, SkipReason},
    resources::{
        cronanything::ConcurrencyPolicy, set_condition, CronAnything, CronAnythingStatus,
        CREATED_BY_LABEL, SCHEDULE_TIME_ANNOTATION,
    },
};
use chrono::{DateTime, Utc};
use jsonpath_rust::{path::config::JsonPathConfig, JsonPathInst};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::{
    api::{
        Api, DeleteParams, DynamicObject, Patch, PatchParams, PostParams, Preconditions, PropagationPolicy,
        ResourceExt,
    },
    runtime::controller::{Action, Context},
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};

/// Whether a terminal child counts toward the `successfulLimit` or the
/// `failedLimit` bucket of a retention policy. The generic controller has no
/// intrinsic notion of "success" for an arbitrary child kind; this is
/// supplied per-kind by a domain wrapper (see [`ClassifierRegistry`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalClass {
    /// Counts toward `retention.successfulLimit`.
    Successful,
    /// Counts toward `retention.failedLimit`.
    Failed,
}

/// Per-child-kind knowledge of which `finishableBy` values count as success
/// versus failure. Registered by domain wrappers (e.g. BackupSchedule for
/// `Backup.status.phase`); never serialized onto the CronAnything spec.
pub trait RetentionClassifier: Send + Sync {
    /// Classifies a terminal `finishableBy` value as successful or failed.
    fn classify(&self, finishable_value: &str) -> TerminalClass;
}

/// Fallback used when no specific classifier is registered for a child kind:
/// every terminal value counts as successful, so `failedLimit` is vacuous
/// and `successfulLimit`/`historyLimit` behave as a single combined cap.
pub struct AllTerminalSuccessful;

impl RetentionClassifier for AllTerminalSuccessful {
    fn classify(&self, _finishable_value: &str) -> TerminalClass {
        TerminalClass::Successful
    }
}

/// Process-wide registry of [`RetentionClassifier`]s keyed by the child's
/// `(group, version, kind)`.
#[derive(Default)]
pub struct ClassifierRegistry {
    classifiers: HashMap<(String, String, String), Arc<dyn RetentionClassifier>>,
}

impl ClassifierRegistry {
    /// An empty registry; every kind falls back to [`AllTerminalSuccessful`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a classifier for a specific child `(group, version, kind)`.
    pub fn register(&mut self, group: &str, version: &str, kind: &str, classifier: Arc<dyn RetentionClassifier>) {
        self.classifiers
            .insert((group.to_string(), version.to_string(), kind.to_string()), classifier);
    }

    fn resolve(&self, group: &str, version: &str, kind: &str) -> Arc<dyn RetentionClassifier> {
        self.classifiers
            .get(&(group.to_string(), version.to_string(), kind.to_string()))
            .cloned()
            .unwrap_or_else(|| Arc::new(AllTerminalSuccessful))
    }
}

/// Shared dependencies threaded through every reconcile via [`Context`].
pub struct CronAnythingContext {
    /// Kubernetes client used for all API calls.
    pub client: kube::Client,
    /// Cache from `(group, version, kind)` to `ApiResource`.
    pub discovery: crate::controllers::discovery::DiscoveryCache,
    /// Per-child-kind success/failure classifiers.
    pub classifiers: ClassifierRegistry,
    /// Default requeue interval after a transient error.
    pub base_requeue: Duration,
}

/// Derives a stable, collision-free child name from the parent name and
/// trigger instant. Kubernetes names are DNS-1123 subdomains, so the RFC3339
/// timestamp is rendered without `:`/`+`.
pub fn derive_child_name(parent_name: &str, trigger: DateTime<Utc>) -> String {
    format!("{parent_name}-{}", trigger.format("%Y%m%dt%H%M%Sz"))
}

/// Evaluates `finishable_by` against a child's JSON representation, returning
/// the raw string value found (if any). `None` means non-terminal (either no
/// `finishable_by` configured, or the path found nothing).
fn evaluate_finishable_by(child: &serde_json::Value, finishable_by: &str) -> Result<Option<String>, Error> {
    let cfg = JsonPathConfig::default();
    let parsed = finishable_by
        .parse::<JsonPathInst>()
        .map_err(|err| Error::InvalidJsonPath {
            path: finishable_by.to_string(),
            reason: err.to_string(),
        })?;
    let found = parsed.find_slice(child, cfg);
    Ok(found.into_iter().next().and_then(|v| v.as_str().map(str::to_string)))
}

/// Classifies a child as terminal (with its raw finishable value) or
/// non-terminal, per the CronAnything's `finishableBy`/`terminalValues`.
fn child_terminal_value(
    child: &DynamicObject,
    finishable_by: Option<&str>,
    terminal_values: &[String],
) -> Result<Option<String>, Error> {
    let Some(path) = finishable_by else {
        return Ok(None);
    };
    let json = serde_json::to_value(child).map_err(|e| Error::TemplateInvalid(e.to_string()))?;
    let Some(value) = evaluate_finishable_by(&json, path)? else {
        return Ok(None);
    };
    if terminal_values.is_empty() || terminal_values.iter().any(|v| v == &value) {
        Ok(Some(value))
    } else {
        Ok(None)
    }
}

/// Pure step 4: compute the triggers due since `since`, dropping any past
/// `trigger_deadline`.
pub fn compute_missed_triggers(
    schedule: &Schedule,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
    trigger_deadline: Option<Duration>,
) -> (Vec<DateTime<Utc>>, Vec<(DateTime<Utc>, SkipReason)>) {
    let all = schedule.triggers(since, now);
    let Some(deadline) = trigger_deadline else {
        return (all, Vec::new());
    };
    let deadline = chrono::Duration::from_std(deadline).unwrap_or(chrono::Duration::zero());
    let mut kept = Vec::new();
    let mut skipped = Vec::new();
    for t in all {
        if now - t > deadline {
            skipped.push((t, SkipReason::MissedDeadline));
        } else {
            kept.push(t);
        }
    }
    (kept, skipped)
}

/// Pure step 5: resolves which triggers survive the concurrency policy, and
/// which non-terminal children (if any) should be deleted under `Replace`.
pub fn resolve_concurrency_policy(
    policy: ConcurrencyPolicy,
    triggers: &[DateTime<Utc>],
    any_non_terminal: bool,
) -> (Vec<DateTime<Utc>>, Vec<(DateTime<Utc>, SkipReason)>, bool) {
    if triggers.is_empty() {
        return (Vec::new(), Vec::new(), false);
    }
    match policy {
        ConcurrencyPolicy::Allow => (triggers.to_vec(), Vec::new(), false),
        ConcurrencyPolicy::Forbid => {
            if any_non_terminal {
                let skipped = triggers.iter().map(|t| (*t, SkipReason::ConcurrencyForbid)).collect();
                (Vec::new(), skipped, false)
            } else {
                (triggers.to_vec(), Vec::new(), false)
            }
        }
        ConcurrencyPolicy::Replace => {
            let newest = *triggers.last().expect("non-empty triggers");
            let skipped = triggers[..triggers.len() - 1]
                .iter()
                .map(|t| (*t, SkipReason::CoalescedByReplace))
                .collect();
            (vec![newest], skipped, true)
        }
    }
}

struct ChildView {
    obj: DynamicObject,
    schedule_time: Option<DateTime<Utc>>,
    terminal_value: Option<String>,
}

/// Pure step 7: partitions children into (keep, delete) under the retention
/// and history-limit policies.
fn plan_retention<'a>(
    children: &'a [ChildView],
    successful_limit: Option<u32>,
    failed_limit: Option<u32>,
    history_limit: Option<u32>,
    classifier: &dyn RetentionClassifier,
) -> Vec<&'a DynamicObject> {
    let mut successful: Vec<&ChildView> = Vec::new();
    let mut failed: Vec<&ChildView> = Vec::new();
    let mut non_terminal: Vec<&ChildView> = Vec::new();

    for c in children {
        match &c.terminal_value {
            None => non_terminal.push(c),
            Some(v) => match classifier.classify(v) {
                TerminalClass::Successful => successful.push(c),
                TerminalClass::Failed => failed.push(c),
            },
        }
    }

    let by_schedule_time = |a: &&ChildView, b: &&ChildView| a.schedule_time.cmp(&b.schedule_time);
    successful.sort_by(by_schedule_time);
    failed.sort_by(by_schedule_time);

    let mut to_delete: Vec<&DynamicObject> = Vec::new();
    if let Some(limit) = successful_limit {
        let limit = limit as usize;
        if successful.len() > limit {
            to_delete.extend(successful.drain(..successful.len() - limit).map(|c| &c.obj));
        }
    }
    if let Some(limit) = failed_limit {
        let limit = limit as usize;
        if failed.len() > limit {
            to_delete.extend(failed.drain(..failed.len() - limit).map(|c| &c.obj));
        }
    }

    if let Some(limit) = history_limit {
        let limit = limit as usize;
        let mut terminal_remaining: Vec<&ChildView> = successful.iter().chain(failed.iter()).copied().collect();
        terminal_remaining.sort_by(by_schedule_time);
        let total_remaining = terminal_remaining.len() + non_terminal.len();
        if total_remaining > limit {
            let excess = total_remaining - limit;
            to_delete.extend(terminal_remaining.into_iter().take(excess).map(|c| &c.obj));
        }
    }

    to_delete
}

/// The async reconcile entry point wired into `kube_runtime::Controller::run`.
pub async fn reconcile(
    cron_anything: Arc<CronAnything>,
    ctx: Context<CronAnythingContext>,
) -> Result<Action, Error> {
    let ctx = ctx.get_ref();
    let name = cron_anything.name_any();
    let ns = cron_anything.namespace().unwrap_or_default();
    let now = Utc::now();

    let api: Api<CronAnything> = Api::namespaced(ctx.client.clone(), &ns);

    if cron_anything.spec.suspend {
        debug!(%name, "cronanything suspended, skipping");
        let mut status = cron_anything.status.clone().unwrap_or_default();
        set_condition(&mut status.conditions, suspended_condition());
        patch_status(&api, &name, status).await?;
        return Ok(Action::await_change());
    }

    let schedule = Schedule::parse(&cron_anything.spec.schedule)?;

    let template = &cron_anything.spec.template;
    let Some(ar) = ctx
        .discovery
        .resolve(&template.group, &template.version, &template.kind)
        .await?
    else {
        warn!(%name, kind = %template.kind, "child kind not yet resolvable via discovery, backing off");
        return Ok(Action::requeue(ctx.base_requeue));
    };

    let children_api: Api<DynamicObject> = Api::namespaced_with(ctx.client.clone(), &ns, &ar);
    let selector = format!("{CREATED_BY_LABEL}={name}");
    let existing = children_api
        .list(&kube::api::ListParams::default().labels(&selector))
        .await?;

    let mut children: Vec<ChildView> = Vec::with_capacity(existing.items.len());
    for obj in existing.items {
        let schedule_time = obj
            .annotations()
            .get(SCHEDULE_TIME_ANNOTATION)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        // A bad `finishableBy` is a terminal spec error (§7), not a reason to
        // treat every child as silently non-terminal — that would also
        // corrupt `Forbid`/`Replace` (always sees in-flight work) and
        // retention classification.
        let terminal_value = child_terminal_value(
            &obj,
            cron_anything.spec.finishable_by.as_deref(),
            &cron_anything.spec.terminal_values,
        )?;
        children.push(ChildView {
            obj,
            schedule_time,
            terminal_value,
        });
    }

    let status = cron_anything.status.clone().unwrap_or_default();
    let since = status
        .last_schedule_time
        .unwrap_or_else(|| cron_anything.creation_timestamp().map(|t| t.0).unwrap_or(now));

    let (missed, mut skip_reasons) = compute_missed_triggers(
        &schedule,
        since,
        now,
        cron_anything
            .spec
            .trigger_deadline_seconds
            .map(|s| Duration::from_secs(s.max(0) as u64)),
    );

    let already_materialised: HashSet<DateTime<Utc>> =
        children.iter().filter_map(|c| c.schedule_time).collect();
    let pending: Vec<DateTime<Utc>> = missed.into_iter().filter(|t| !already_materialised.contains(t)).collect();

    let any_non_terminal = children.iter().any(|c| c.terminal_value.is_none());
    let (selected, policy_skips, replace_active) =
        resolve_concurrency_policy(cron_anything.spec.concurrency_policy, &pending, any_non_terminal);
    skip_reasons.extend(policy_skips);

    if replace_active {
        for c in children.iter().filter(|c| c.terminal_value.is_none()) {
            delete_child(&children_api, &c.obj).await?;
        }
    }

    for trigger in &selected {
        materialise_child(&children_api, &cron_anything, &template.spec, *trigger).await?;
    }

    // Re-list is unnecessary for retention: children we just created are
    // non-terminal by construction and never subject to this pass's limits.
    let classifier = ctx
        .classifiers
        .resolve(&template.group, &template.version, &template.kind);
    let to_delete = plan_retention(
        &children,
        cron_anything.spec.retention.as_ref().and_then(|r| r.successful_limit),
        cron_anything.spec.retention.as_ref().and_then(|r| r.failed_limit),
        cron_anything.spec.history_limit,
        classifier.as_ref(),
    );
    for child in to_delete {
        delete_child(&children_api, child).await?;
    }

    let mut new_status = status.clone();
    let newest_trigger = pending.iter().chain(selected.iter()).max().copied();
    new_status.last_schedule_time = [new_status.last_schedule_time, newest_trigger]
        .into_iter()
        .flatten()
        .max();
    new_status.active_children = children.len() as i32 + selected.len() as i32;
    for (t, reason) in &skip_reasons {
        info!(%name, trigger = %t, reason = reason.as_str(), "trigger skipped");
    }
    set_condition(&mut new_status.conditions, ready_condition());
    patch_status(&api, &name, new_status).await?;

    Ok(Action::requeue(
        (schedule.next(now) - now).to_std().unwrap_or(ctx.base_requeue),
    ))
}

async fn materialise_child(
    children_api: &Api<DynamicObject>,
    parent: &CronAnything,
    template_spec: &serde_json::Value,
    trigger: DateTime<Utc>,
) -> Result<(), Error> {
    let parent_name = parent.name_any();
    let child_name = derive_child_name(&parent_name, trigger);

    if let Some(existing) = children_api.get_opt(&child_name).await? {
        let owned = existing
            .labels()
            .get(CREATED_BY_LABEL)
            .map(|v| v == &parent_name)
            .unwrap_or(false);
        return if owned {
            Ok(())
        } else {
            Err(Error::NameConflict { name: child_name })
        };
    }

    let owner_ref = parent
        .controller_owner_ref(&())
        .ok_or(Error::UnnamedObject)?;

    let mut labels = std::collections::BTreeMap::new();
    labels.insert(CREATED_BY_LABEL.to_string(), parent_name.clone());
    let mut annotations = std::collections::BTreeMap::new();
    annotations.insert(SCHEDULE_TIME_ANNOTATION.to_string(), trigger.to_rfc3339());

    let mut child_json = template_spec.clone();
    if let Some(obj) = child_json.as_object_mut() {
        obj.insert("metadata".to_string(), serde_json::json!({
            "name": child_name,
            "namespace": parent.namespace(),
            "labels": labels,
            "annotations": annotations,
            "ownerReferences": [owner_ref],
        }));
    }
    let child: DynamicObject = serde_json::from_value(child_json).map_err(|e| Error::TemplateInvalid(e.to_string()))?;

    match children_api.create(&PostParams::default(), &child).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(resp)) if resp.code == 409 => Ok(()),
        Err(e) => Err(Error::Kube(e)),
    }
}

async fn delete_child(children_api: &Api<DynamicObject>, child: &DynamicObject) -> Result<(), Error> {
    let name = child.name_any();
    let dp = DeleteParams {
        propagation_policy: Some(PropagationPolicy::Foreground),
        preconditions: Some(Preconditions {
            uid: child.uid(),
            resource_version: None,
        }),
        ..Default::default()
    };
    match children_api.delete(&name, &dp).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
        Err(e) => Err(Error::Kube(e)),
    }
}

async fn patch_status(api: &Api<CronAnything>, name: &str, status: CronAnythingStatus) -> Result<(), Error> {
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    Ok(())
}

fn ready_condition() -> Condition {
    Condition {
        type_: "Ready".to_string(),
        status: "True".to_string(),
        reason: "ReconcileSucceeded".to_string(),
        message: "last reconcile completed".to_string(),
        observed_generation: None,
        last_transition_time: Time(Utc::now()),
    }
}

fn suspended_condition() -> Condition {
    Condition {
        type_: "Ready".to_string(),
        status: "False".to_string(),
        reason: "Suspended".to_string(),
        message: "spec.suspend is true".to_string(),
        observed_generation: None,
        last_transition_time: Time(Utc::now()),
    }
}

/// Maps reconcile errors to the requeue-with-backoff vs. await-change
/// policy, per the error taxonomy.
pub fn error_policy(error: &Error, ctx: Context<CronAnythingContext>) -> Action {
    match error {
        Error::Kube(_) | Error::DiscoveryUnresolved { .. } => {
            warn!(%error, "transient error, requeuing with backoff");
            Action::requeue(ctx.get_ref().base_requeue)
        }
        Error::InvalidSchedule(_)
        | Error::TemplateInvalid(_)
        | Error::NameConflict { .. }
        | Error::InvalidJsonPath { .. }
        | Error::UnnamedObject => {
            warn!(%error, "terminal error, awaiting spec change");
            Action::await_change()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn derives_stable_collision_free_names() {
        let t = dt(2024, 1, 1, 0, 1);
        assert_eq!(derive_child_name("nightly", t), "nightly-20240101t000100z");
        assert_eq!(derive_child_name("nightly", t), derive_child_name("nightly", t));
    }

    #[test]
    fn missed_triggers_respect_deadline() {
        let schedule = Schedule::parse("* * * * *").unwrap();
        let since = dt(2024, 1, 1, 0, 0);
        let now = dt(2024, 1, 1, 0, 5);
        let (kept, skipped) = compute_missed_triggers(&schedule, since, now, Some(Duration::from_secs(150)));
        // minutes 1..=5 are candidates; only those within 150s (2.5m) of `now` survive.
        assert_eq!(kept, vec![dt(2024, 1, 1, 0, 3), dt(2024, 1, 1, 0, 4), dt(2024, 1, 1, 0, 5)]);
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().all(|(_, r)| *r == SkipReason::MissedDeadline));
    }

    #[test]
    fn forbid_skips_all_when_non_terminal_present() {
        let triggers = vec![dt(2024, 1, 1, 0, 1)];
        let (selected, skipped, replace) =
            resolve_concurrency_policy(ConcurrencyPolicy::Forbid, &triggers, true);
        assert!(selected.is_empty());
        assert_eq!(skipped, vec![(triggers[0], SkipReason::ConcurrencyForbid)]);
        assert!(!replace);
    }

    #[test]
    fn forbid_allows_when_all_terminal() {
        let triggers = vec![dt(2024, 1, 1, 0, 1)];
        let (selected, skipped, _) = resolve_concurrency_policy(ConcurrencyPolicy::Forbid, &triggers, false);
        assert_eq!(selected, triggers);
        assert!(skipped.is_empty());
    }

    #[test]
    fn replace_coalesces_to_newest() {
        let triggers = vec![dt(2024, 1, 1, 0, 1), dt(2024, 1, 1, 0, 2), dt(2024, 1, 1, 0, 3)];
        let (selected, skipped, replace) =
            resolve_concurrency_policy(ConcurrencyPolicy::Replace, &triggers, true);
        assert_eq!(selected, vec![dt(2024, 1, 1, 0, 3)]);
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().all(|(_, r)| *r == SkipReason::CoalescedByReplace));
        assert!(replace);
    }

    #[test]
    fn allow_keeps_every_trigger() {
        let triggers = vec![dt(2024, 1, 1, 0, 1), dt(2024, 1, 1, 0, 2)];
        let (selected, skipped, replace) = resolve_concurrency_policy(ConcurrencyPolicy::Allow, &triggers, true);
        assert_eq!(selected, triggers);
        assert!(skipped.is_empty());
        assert!(!replace);
    }
}
