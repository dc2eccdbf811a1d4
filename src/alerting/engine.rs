use crate::{
    alerting::{
        evaluator::{Evaluator, Transition},
        notify::Notifier,
        record::{AlertRecord, AlertStatus, RecordFilter},
        rule::{AlertRule, AlertSeverity},
        sampler::Snapshot,
        store::AlertStore,
    },
    format::format_uptime,
    metrics::{
        Status,
        alerting::{record_evaluation_cycle, record_evaluation_error, set_alerts_firing},
    },
    monitor::MonitorService,
    now_millis,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

/// Seconds to wait after a failed evaluation cycle
const RETRY_DELAY: u64 = 120;

/// Periodically samples the cluster and turns rule breaches into alerts
pub struct AlertEngine {
    monitor: MonitorService,
    store: Arc<AlertStore>,
    notifier: Arc<Notifier>,
    evaluator: Mutex<Evaluator>,
    interval: u64,
}

impl AlertEngine {
    pub fn new(
        monitor: MonitorService,
        store: Arc<AlertStore>,
        notifier: Arc<Notifier>,
        interval: u64,
    ) -> Self {
        Self {
            monitor,
            store,
            notifier,
            evaluator: Mutex::new(Evaluator::new()),
            interval,
        }
    }

    /// Start the evaluation loop
    pub async fn start(&self) {
        tracing::info!("Starting alert evaluator (every {}s)", self.interval);

        loop {
            if let Err(e) = self.run_once().await {
                tracing::error!("Alert evaluation failed: {:#}", e);
                record_evaluation_error();
                record_evaluation_cycle(Status::Failure);

                tokio::time::sleep(Duration::from_secs(RETRY_DELAY)).await;
                continue;
            }

            record_evaluation_cycle(Status::Success);
            tokio::time::sleep(Duration::from_secs(self.interval)).await;
        }
    }

    /// Run a single evaluation cycle
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> anyhow::Result<()> {
        let rules = self.store.list_rules();

        if !rules.iter().any(|r| r.enabled) {
            tracing::debug!("No enabled alert rules");
            self.update_firing_gauges();
            return Ok(());
        }

        let snapshot = Snapshot::collect(&self.monitor, &rules).await?;
        let samples = snapshot.samples(self.monitor.kibana().cluster_id());

        tracing::info!(
            "Evaluating {} rules against {} samples (cluster {:?}, up {})",
            rules.len(),
            samples.len(),
            snapshot.overview.cluster_status.status,
            format_uptime(snapshot.overview.cluster_status.up_time.max(0) as u64)
        );

        let now = now_millis();
        let active = self.store.active_records();
        let transitions = self
            .evaluator
            .lock()
            .evaluate(&rules, &samples, &active, now);

        for transition in transitions {
            match transition {
                Transition::Fire(record) => {
                    tracing::warn!("Alert fired: {}", record.message);

                    self.store.insert_record(record.clone());
                    self.notify(&rules, &record).await;
                }
                Transition::Resolve { record_id } => {
                    if let Err(e) = self.store.resolve(&record_id, now) {
                        tracing::debug!("Skipping resolve of {}: {}", record_id, e);
                        continue;
                    }

                    tracing::info!("Alert {} resolved", record_id);
                }
            }
        }

        self.update_firing_gauges();

        Ok(())
    }

    /// Send a fired alert to the rule's enabled channels
    async fn notify(&self, rules: &[AlertRule], record: &AlertRecord) {
        let Some(rule) = rules.iter().find(|r| r.id == record.rule_id) else {
            return;
        };

        let mut attempts = Vec::new();

        for channel_id in &rule.notification_channels {
            let channel = match self.store.get_channel(channel_id) {
                Ok(channel) if channel.enabled => channel,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Rule '{}' refers to a missing channel: {}", rule.name, e);
                    continue;
                }
            };

            attempts.push(
                self.notifier
                    .notify_alert(&channel, record, now_millis())
                    .await,
            );
        }

        if !attempts.is_empty() {
            self.store.add_notifications(&record.id, attempts);
        }
    }

    fn update_firing_gauges(&self) {
        let firing = self.store.list_records(&RecordFilter {
            status: Some(AlertStatus::Firing),
            ..Default::default()
        });

        for severity in AlertSeverity::ALL {
            let count = firing.iter().filter(|r| r.severity == severity).count();
            set_alerts_firing(severity.as_str(), count);
        }
    }
}
