use crate::metrics::Status;
use metrics::{counter, describe_counter, describe_gauge, gauge};

pub(super) fn register_metrics() {
    // Labeled with the status (success or failure)
    describe_counter!(
        "alert_evaluation_cycles_total",
        "Total number of alert evaluation cycles"
    );

    describe_counter!(
        "alert_evaluation_errors_total",
        "Total number of failed alert evaluation cycles"
    );

    describe_gauge!(
        "alerts_firing",
        "Number of firing alerts, labeled by severity"
    );

    describe_counter!(
        "alert_notifications_total",
        "Total number of notification attempts, labeled by channel type and status"
    );
}

pub fn record_evaluation_cycle(status: Status) {
    counter!("alert_evaluation_cycles_total", "status" => status.to_string()).increment(1);
}

pub fn record_evaluation_error() {
    counter!("alert_evaluation_errors_total").increment(1);
}

/// Set the number of firing alerts for a severity
pub fn set_alerts_firing(severity: &str, count: usize) {
    gauge!("alerts_firing", "severity" => severity.to_string()).set(count as f64);
}

pub fn record_notification(channel_type: &str, status: Status) {
    counter!(
        "alert_notifications_total",
        "channel_type" => channel_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
