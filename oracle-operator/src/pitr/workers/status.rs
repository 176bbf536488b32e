//! Status condition ticker (§4.4.6): a plain `tokio::time::interval` task,
//! *not* a `kube_runtime::Controller` reconcile loop, that periodically
//! reads the in-memory worker state machine and the latest recovery-window
//! computation and patches them onto the `Pitr` object's `status`
//! subresource.

use crate::{
    error::PitrError,
    pitr::{metadata_store::MetadataStore, state::EngineState, window, PitrRef},
    resources::{
        pitr::{Pitr, PitrPhase, PitrStatus, RecoveryWindow},
        set_condition,
    },
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::api::{Api, Patch, PatchParams};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Periodically patches the `Pitr` object's `status` from in-memory engine state.
pub struct StatusTicker {
    /// Kubernetes client used to patch `status`.
    pub client: kube::Client,
    /// The `Pitr` object this ticker patches.
    pub pitr_ref: PitrRef,
    /// The `LogEntry` index to derive recovery windows from.
    pub metadata_store: Arc<MetadataStore>,
    /// Shared engine lifecycle state.
    pub state: Arc<EngineState>,
    /// How often to patch status.
    pub interval: Duration,
}

/// Builds the desired status document from worker state; kept free of any
/// Kubernetes API access so it can be exercised without a live or fake API
/// server.
pub fn build_status(
    entries: &[crate::pitr::metadata_store::LogEntry],
    phase: crate::pitr::state::Phase,
    degraded_reason: Option<String>,
) -> PitrStatus {
    let windows = window::recovery_windows(entries);

    let mut status = PitrStatus {
        phase: match phase {
            crate::pitr::state::Phase::Bootstrapping => PitrPhase::Bootstrapping,
            crate::pitr::state::Phase::Replicating => PitrPhase::Replicating,
            crate::pitr::state::Phase::Degraded => PitrPhase::Degraded,
            crate::pitr::state::Phase::Terminating => PitrPhase::Terminating,
        },
        available_recovery_windows: windows
            .iter()
            .map(|w| RecoveryWindow {
                begin: w.begin_time,
                end: w.end_time,
            })
            .collect(),
        last_replication_time: entries.iter().map(|e| e.next_time).max(),
        conditions: Vec::new(),
    };

    let (cond_status, reason, message) = match phase {
        crate::pitr::state::Phase::Degraded => (
            "False",
            "WorkerDegraded".to_string(),
            degraded_reason.unwrap_or_else(|| "a worker is degraded".to_string()),
        ),
        crate::pitr::state::Phase::Terminating => ("False", "Terminating".to_string(), "engine is shutting down".to_string()),
        _ => ("True", "WorkersHealthy".to_string(), "all PITR workers are healthy".to_string()),
    };
    set_condition(
        &mut status.conditions,
        Condition {
            type_: "Ready".to_string(),
            status: cond_status.to_string(),
            reason,
            message,
            observed_generation: None,
            last_transition_time: Time(chrono::Utc::now()),
        },
    );
    status
}

impl StatusTicker {
    /// Computes and patches the current status document once.
    pub async fn tick_once(&self) -> Result<(), PitrError> {
        let entries = self.metadata_store.entries().await?;
        let status = build_status(&entries, self.state.phase(), self.state.degraded_reason());

        let api: Api<Pitr> = Api::namespaced(self.client.clone(), &self.pitr_ref.namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(&self.pitr_ref.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| PitrError::Agent(format!("status patch failed: {e}")))?;
        Ok(())
    }

    /// Runs status ticks on `interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            match self.tick_once().await {
                Ok(()) => debug!("status ticker updated Pitr status"),
                Err(e) => warn!(error = %e, "status ticker failed to patch Pitr status"),
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitr::state::Phase;

    #[test]
    fn degraded_phase_produces_false_ready_condition() {
        let status = build_status(&[], Phase::Degraded, Some("agent unreachable".to_string()));
        assert_eq!(status.phase, PitrPhase::Degraded);
        let ready = status.conditions.iter().find(|c| c.type_ == "Ready").unwrap();
        assert_eq!(ready.status, "False");
        assert_eq!(ready.message, "agent unreachable");
    }

    #[test]
    fn replicating_phase_produces_true_ready_condition() {
        let status = build_status(&[], Phase::Replicating, None);
        assert_eq!(status.phase, PitrPhase::Replicating);
        let ready = status.conditions.iter().find(|c| c.type_ == "Ready").unwrap();
        assert_eq!(ready.status, "True");
    }
}
