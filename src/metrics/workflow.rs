use crate::metrics::Status;
use metrics::{counter, describe_counter};

pub(super) fn register_metrics() {
    describe_counter!(
        "workflow_steps_total",
        "Total number of executed workflow steps, labeled by step type and status"
    );

    describe_counter!(
        "workflow_instances_total",
        "Total number of finished workflow instances, labeled by status"
    );
}

pub fn record_step(step_type: &str, status: Status) {
    counter!(
        "workflow_steps_total",
        "step_type" => step_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_instance(status: Status) {
    counter!("workflow_instances_total", "status" => status.to_string()).increment(1);
}
