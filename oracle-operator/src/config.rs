//! Operator-wide settings, read once at startup.

use clap::Parser;
use std::time::Duration;

/// CLI/env-configurable settings for the operator process.
#[derive(Debug, Clone, Parser)]
#[command(name = "oracle-operator", about = "Scheduling and PITR control plane")]
pub struct Config {
    /// Log format: `text` or `json`.
    #[arg(long, env = "OPERATOR_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Default interval to requeue a reconciler after a transient error,
    /// before backoff is applied.
    #[arg(long, env = "OPERATOR_BASE_REQUEUE", default_value = "5s", value_parser = parse_duration)]
    pub base_requeue: Duration,

    /// Interval at which the PITR status condition reconcile loop runs.
    #[arg(long, env = "OPERATOR_PITR_STATUS_INTERVAL", default_value = "30s", value_parser = parse_duration)]
    pub pitr_status_interval: Duration,

    /// Grace period given to PITR workers to drain on deletion.
    #[arg(long, env = "OPERATOR_PITR_DRAIN_GRACE", default_value = "30s", value_parser = parse_duration)]
    pub pitr_drain_grace: Duration,
}

/// Log output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// Newline-delimited JSON.
    Json,
}

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}
