//! The Pitr reconciler (§4.4.7): a thin, finalizer-driven wrapper around the
//! long-running [`crate::pitr::engine::Engine`]. Unlike CronAnything and
//! BackupSchedule, this reconcile body's only job is lifecycle management —
//! start an engine on first `Apply`, drain it on `Cleanup` — since the
//! engine's own workers are not level-triggered.

use crate::{
    pitr::{
        agent::{DatabaseDaemonClient, UnimplementedDatabaseDaemonClient},
        engine::{Engine, EngineConfig, GcsObjectStoreFactory, ObjectStoreFactory},
        PitrRef,
    },
    resources::Pitr,
};
use kube::{
    runtime::{
        controller::{Action, Context},
        finalizer::{finalizer, Error as FinalizerError, Event},
    },
    ResourceExt,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Finalizer name added to every `Pitr` object this controller owns an engine for.
pub const FINALIZER_NAME: &str = "pitr.oracle.db.anthosapis.com/engine";

/// Errors from the Pitr reconciler's engine lifecycle management.
#[derive(Debug, Error)]
pub enum Error {
    /// Transient Kubernetes API error; requeue with backoff.
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    /// The PITR engine failed to start.
    #[error("pitr engine error: {0}")]
    Pitr(#[from] crate::error::PitrError),
    /// The object being reconciled has no name set.
    #[error("object has no name")]
    UnnamedObject,
}

/// Running engines keyed by namespace/name, so `Cleanup` can find the
/// engine started by an earlier `Apply` and drain it.
#[derive(Default)]
pub struct EngineRegistry {
    engines: Mutex<HashMap<(String, String), Engine>>,
}

impl EngineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shared dependencies threaded through every Pitr reconcile via [`Context`].
pub struct PitrContext {
    /// Kubernetes client used for all API calls.
    pub client: kube::Client,
    /// Default requeue interval once an engine is running.
    pub base_requeue: Duration,
    /// Interval at which a started engine refreshes its status condition.
    pub status_interval: Duration,
    /// Grace period given to a started engine's workers to drain on deletion.
    pub drain_grace_period: Duration,
    /// Running engines, keyed by namespace/name.
    pub registry: Arc<EngineRegistry>,
    /// Builds the data-plane agent client for a given `Pitr` object.
    pub agent_factory: Box<dyn Fn(&Pitr) -> Arc<dyn DatabaseDaemonClient> + Send + Sync>,
    /// Builds the object store backing a started engine.
    pub store_factory: Box<dyn ObjectStoreFactory>,
}

impl PitrContext {
    /// The production default: an unimplemented data-plane client (the gRPC
    /// transport is out of scope, per §1) and a real GCS-backed object store.
    pub fn production(client: kube::Client, base_requeue: Duration, status_interval: Duration, drain_grace_period: Duration) -> Self {
        PitrContext {
            client,
            base_requeue,
            status_interval,
            drain_grace_period,
            registry: Arc::new(EngineRegistry::new()),
            agent_factory: Box::new(|pitr: &Pitr| {
                Arc::new(UnimplementedDatabaseDaemonClient {
                    agent_image: pitr.spec.images.agent.clone(),
                })
            }),
            store_factory: Box::new(GcsObjectStoreFactory),
        }
    }
}

fn engine_config(pitr: &Pitr, ctx: &PitrContext) -> EngineConfig {
    EngineConfig {
        storage_uri: pitr.spec.storage_uri.clone(),
        retention_days: pitr.spec.retention_days,
        archive_lag_seconds: pitr.spec.archive_lag_seconds,
        replication_interval: ctx.base_requeue,
        metadata_interval: ctx.base_requeue.saturating_mul(6),
        retention_interval: Duration::from_secs(3600),
        sweeper_interval: Duration::from_secs(3600),
        sweeper_grace_period: Duration::from_secs(3600),
        status_interval: ctx.status_interval,
        drain_grace_period: ctx.drain_grace_period,
    }
}

async fn apply(pitr: Arc<Pitr>, ctx: &PitrContext) -> Result<Action, Error> {
    let name = pitr.name_any();
    if name.is_empty() {
        return Err(Error::UnnamedObject);
    }
    let ns = pitr.namespace().unwrap_or_default();
    let key = (ns.clone(), name.clone());

    let mut engines = ctx.registry.engines.lock().await;
    if !engines.contains_key(&key) {
        let agent = (ctx.agent_factory)(&pitr);
        let engine = Engine::start(
            PitrRef {
                namespace: ns.clone(),
                name: name.clone(),
            },
            ctx.client.clone(),
            agent,
            ctx.store_factory.as_ref(),
            engine_config(&pitr, ctx),
        )?;
        info!(namespace = %ns, name = %name, "started PITR engine");
        engines.insert(key, engine);
    }

    Ok(Action::requeue(ctx.base_requeue.saturating_mul(10)))
}

async fn cleanup(pitr: Arc<Pitr>, ctx: &PitrContext) -> Result<Action, Error> {
    let name = pitr.name_any();
    let ns = pitr.namespace().unwrap_or_default();
    let key = (ns, name);

    let engine = ctx.registry.engines.lock().await.remove(&key);
    if let Some(engine) = engine {
        engine.shutdown(ctx.drain_grace_period).await;
    }
    Ok(Action::await_change())
}

/// Starts an engine on `Event::Apply` and drains it on `Event::Cleanup`, via
/// `kube_runtime::finalizer`'s standard idempotent-cleanup flow.
pub async fn reconcile(pitr: Arc<Pitr>, ctx: Context<PitrContext>) -> Result<Action, FinalizerError<Error>> {
    let ctx = ctx.get_ref();
    let ns = pitr.namespace().unwrap_or_default();
    let api: kube::Api<Pitr> = kube::Api::namespaced(ctx.client.clone(), &ns);
    finalizer(&api, FINALIZER_NAME, pitr, |event| async {
        match event {
            Event::Apply(pitr) => apply(pitr, ctx).await,
            Event::Cleanup(pitr) => cleanup(pitr, ctx).await,
        }
    })
    .await
}

/// Requeues with backoff on any error.
pub fn error_policy(error: &FinalizerError<Error>, ctx: Context<PitrContext>) -> Action {
    warn!(%error, "pitr reconcile failed, requeuing with backoff");
    Action::requeue(ctx.get_ref().base_requeue)
}
