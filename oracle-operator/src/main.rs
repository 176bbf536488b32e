//! Entry point: wires up the three controllers (CronAnything, BackupSchedule,
//! Pitr) against a single shared client and runs them concurrently until a
//! shutdown signal is received.

mod config;
mod controllers;
mod cron;
mod error;
mod pitr;
mod resources;

use clap::Parser;
use config::{Config, LogFormat};
use controllers::{
    backupschedule::{BackupPhaseClassifier, BackupScheduleContext},
    cronanything::{ClassifierRegistry, CronAnythingContext},
    discovery::DiscoveryCache,
    pitr::PitrContext,
};
use futures::StreamExt;
use kube::{
    runtime::{controller::Context, Controller},
    Api, Client, Resource,
};
use resources::{Backup, BackupSchedule, CronAnything, Pitr};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let client = Client::try_default().await?;
    info!("connected to kubernetes api server");

    let mut classifiers = ClassifierRegistry::new();
    classifiers.register(
        &Backup::group(&()),
        &Backup::version(&()),
        &Backup::kind(&()),
        Arc::new(BackupPhaseClassifier),
    );

    let cronanything_ctx = Context::new(CronAnythingContext {
        client: client.clone(),
        discovery: DiscoveryCache::new(client.clone()),
        classifiers,
        base_requeue: config.base_requeue,
    });

    let backupschedule_ctx = Context::new(BackupScheduleContext {
        client: client.clone(),
        base_requeue: config.base_requeue,
    });

    let pitr_ctx = Context::new(PitrContext::production(
        client.clone(),
        config.base_requeue,
        config.pitr_status_interval,
        config.pitr_drain_grace,
    ));

    let cronanything_controller = Controller::new(Api::<CronAnything>::all(client.clone()), Default::default())
        .shutdown_on_signal()
        .run(controllers::cronanything::reconcile, controllers::cronanything::error_policy, cronanything_ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!(object = ?o, "reconciled CronAnything"),
                Err(e) => warn!(error = %e, "CronAnything reconcile failed"),
            }
        });

    let backupschedule_controller = Controller::new(Api::<BackupSchedule>::all(client.clone()), Default::default())
        .owns(Api::<CronAnything>::all(client.clone()), Default::default())
        .shutdown_on_signal()
        .run(
            controllers::backupschedule::reconcile,
            controllers::backupschedule::error_policy,
            backupschedule_ctx,
        )
        .for_each(|res| async move {
            match res {
                Ok(o) => info!(object = ?o, "reconciled BackupSchedule"),
                Err(e) => warn!(error = %e, "BackupSchedule reconcile failed"),
            }
        });

    let pitr_controller = Controller::new(Api::<Pitr>::all(client.clone()), Default::default())
        .shutdown_on_signal()
        .run(controllers::pitr::reconcile, controllers::pitr::error_policy, pitr_ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!(object = ?o, "reconciled Pitr"),
                Err(e) => error!(error = %e, "Pitr reconcile failed"),
            }
        });

    tokio::join!(cronanything_controller, backupschedule_controller, pitr_controller);

    info!("all controllers shut down, exiting");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}
