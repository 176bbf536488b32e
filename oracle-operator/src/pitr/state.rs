//! The PITR engine's lifecycle state machine (§4.4.6): `Bootstrapping` until
//! the initial hash-cache warm-up and a first successful replication pass
//! complete, then `Replicating` as long as workers are healthy, falling back
//! to `Degraded` on a worker error, and `Terminating` once shutdown has been
//! requested. Surfaced to Kubernetes only via the `Ready`/`Degraded`
//! conditions the status ticker writes (§4.4.6) — this type itself never
//! touches the API server.

use std::sync::RwLock;

/// The engine's current lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not yet completed a first successful parameter-set and upload.
    Bootstrapping,
    /// Shipping logs normally.
    Replicating,
    /// Persistent upload/RPC failures exceeding the degraded threshold.
    Degraded,
    /// Shutdown has been requested; workers are draining.
    Terminating,
}

/// Shared, lock-guarded engine state read by the status ticker and written
/// by the workers. A plain [`std::sync::RwLock`] is sufficient since no
/// holder ever awaits while holding the guard.
pub struct EngineState {
    phase: RwLock<Phase>,
    degraded_reason: RwLock<Option<String>>,
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState {
            phase: RwLock::new(Phase::Bootstrapping),
            degraded_reason: RwLock::new(None),
        }
    }
}

impl EngineState {
    /// The current phase.
    pub fn phase(&self) -> Phase {
        *self.phase.read().unwrap()
    }

    /// The reason recorded by the most recent `mark_degraded` call, if any.
    pub fn degraded_reason(&self) -> Option<String> {
        self.degraded_reason.read().unwrap().clone()
    }

    /// Bootstrapping is only ever left for Replicating, once the first
    /// replication pass succeeds.
    pub fn mark_bootstrapped(&self) {
        let mut phase = self.phase.write().unwrap();
        if *phase == Phase::Bootstrapping {
            *phase = Phase::Replicating;
        }
    }

    /// A worker reports its own failures here; Terminating always wins over
    /// a late degrade report racing against shutdown.
    pub fn mark_degraded(&self, reason: impl Into<String>) {
        let mut phase = self.phase.write().unwrap();
        if *phase == Phase::Terminating {
            return;
        }
        *phase = Phase::Degraded;
        *self.degraded_reason.write().unwrap() = Some(reason.into());
    }

    /// A worker clears degraded status by reporting a clean pass.
    pub fn mark_healthy(&self) {
        let mut phase = self.phase.write().unwrap();
        match *phase {
            Phase::Degraded => {
                *phase = Phase::Replicating;
                *self.degraded_reason.write().unwrap() = None;
            }
            Phase::Bootstrapping => *phase = Phase::Replicating,
            Phase::Replicating | Phase::Terminating => {}
        }
    }

    /// Marks the engine as draining; sticky against later `mark_degraded` calls.
    pub fn mark_terminating(&self) {
        *self.phase.write().unwrap() = Phase::Terminating;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_bootstrapping() {
        let state = EngineState::default();
        assert_eq!(state.phase(), Phase::Bootstrapping);
    }

    #[test]
    fn degrade_then_recover() {
        let state = EngineState::default();
        state.mark_healthy();
        assert_eq!(state.phase(), Phase::Replicating);

        state.mark_degraded("agent unreachable");
        assert_eq!(state.phase(), Phase::Degraded);
        assert_eq!(state.degraded_reason().as_deref(), Some("agent unreachable"));

        state.mark_healthy();
        assert_eq!(state.phase(), Phase::Replicating);
        assert_eq!(state.degraded_reason(), None);
    }

    #[test]
    fn terminating_is_sticky() {
        let state = EngineState::default();
        state.mark_terminating();
        state.mark_degraded("late failure");
        assert_eq!(state.phase(), Phase::Terminating);
    }
}
