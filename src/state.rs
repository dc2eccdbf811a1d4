use crate::{
    alerting::{notify::Notifier, store::AlertStore},
    approval::store::ApprovalStore,
    console::Console,
    monitor::MonitorService,
    workflow::{executor::Executor, store::WorkflowStore},
};
use std::sync::Arc;

/// Shared handles for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorService,
    pub alerts: Arc<AlertStore>,
    pub notifier: Arc<Notifier>,
    pub approvals: Arc<ApprovalStore>,
    pub workflows: Arc<WorkflowStore>,
    pub executor: Arc<Executor>,
    pub console: Arc<Console>,
}

impl AppState {
    /// Wire the stores, executor and console around one monitoring service
    pub fn new(monitor: MonitorService, notifier: Arc<Notifier>, now: i64) -> Self {
        let requests = monitor.kibana_handle();
        let alerts = Arc::new(AlertStore::new());
        let approvals = Arc::new(ApprovalStore::new());
        let workflows = Arc::new(WorkflowStore::new(now));
        let executor = Arc::new(Executor::new(
            workflows.clone(),
            approvals.clone(),
            alerts.clone(),
            notifier.clone(),
            requests.clone(),
        ));
        let console = Arc::new(Console::new(requests));

        Self {
            monitor,
            alerts,
            notifier,
            approvals,
            workflows,
            executor,
            console,
        }
    }
}
