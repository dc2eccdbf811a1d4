use metrics::{describe_gauge, gauge};

pub(super) fn register_metrics() {
    describe_gauge!(
        "process_start_time_seconds",
        "Start time of the process in seconds since the Unix epoch"
    );

    describe_gauge!(
        "build_info",
        "Build information of the application, labeled by version"
    );

    record_process_start_time();
    record_build_info();
}

/// Record the process start time in seconds since the Unix epoch
pub fn record_process_start_time() {
    let start_time = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;

    gauge!("process_start_time_seconds").set(start_time);
}

pub fn record_build_info() {
    gauge!("build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}
