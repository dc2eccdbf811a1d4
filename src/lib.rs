use clap::Parser;
use std::path::PathBuf;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};

pub mod alerting;
pub mod approval;
pub mod config;
pub mod console;
pub mod error;
pub mod format;
pub mod http;
pub mod kibana;
pub mod metrics;
pub mod monitor;
pub mod state;
pub mod workflow;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Interval in seconds between alert evaluations
    #[arg(short, long, default_value = "60")]
    pub interval: u64,

    /// Do not start the alert evaluator
    #[arg(long)]
    pub disable_alerting: bool,
}

/// Handle signals
pub fn signal_handler() {
    tokio::spawn(async move {
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            tracing::error!("Unable to install signal handlers");
            return;
        };

        select! {
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, exiting");
                std::process::exit(0);
            }
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, exiting");
                std::process::exit(0);
            }
        }
    });
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Short random identifier with a readable prefix, e.g. `rule-3f9c1a2b`
pub fn new_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..12])
}
