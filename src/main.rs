use clap::Parser;
use es_manage::{
    Args,
    alerting::{engine::AlertEngine, notify::Notifier},
    config, http,
    kibana::KibanaClient,
    metrics,
    monitor::MonitorService,
    now_millis, signal_handler,
    state::AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Register metrics
    metrics::register_metrics()?;

    // Parse config
    let args = Args::parse();
    let config = config::Config::from_file(&args.config)?.with_cli(&args);

    // Handle signals
    signal_handler();

    let kibana = Arc::new(KibanaClient::new(config.kibana.clone())?);
    let monitor = MonitorService::new(kibana);
    let notifier = Arc::new(Notifier::new()?);
    let state = AppState::new(monitor.clone(), notifier.clone(), now_millis());

    // Seed alerting from the config file
    for seed in &config.alerting.channels {
        if let Err(e) = state
            .alerts
            .insert_channel(seed.id.clone(), seed.channel.clone(), now_millis())
        {
            tracing::error!("Unable to add channel '{}': {}", seed.id, e);
        }
    }

    for rule in &config.alerting.rules {
        if let Err(e) = state.alerts.create_rule(rule.clone(), now_millis()) {
            tracing::error!("Unable to add rule '{}': {}", rule.name, e);
        }
    }

    // Start the alert evaluator
    if !config.cli.disable_alerting {
        let engine = AlertEngine::new(
            monitor,
            state.alerts.clone(),
            notifier,
            config.cli.interval,
        );

        tokio::spawn(async move { engine.start().await });
    }

    // Start the HTTP server
    http::create_server(&config, state).await
}
