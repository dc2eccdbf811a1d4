use crate::{
    alerting::{notify::Message, notify::Notifier, store::AlertStore},
    approval::{ApprovalRequest, ApprovalStatus, store::ApprovalStore},
    error::StoreError,
    kibana::{HttpMethod, KibanaClient, ProxyResponse},
    metrics::{
        Status,
        workflow::{record_instance, record_step},
    },
    now_millis,
    workflow::{
        condition::SuccessCondition,
        instance::{
            InstanceStatus, NewInstance, StepResult, TriggerType, WorkflowInstance, WorkflowStep,
        },
        operation::{ApiConfig, Schema},
        render::{RenderError, render, step_variables},
        store::{NextStep, WorkflowStore},
        template::{WorkflowStepType, WorkflowTemplate},
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::{sync::Arc, time::Instant};
use tokio::task::JoinHandle;

/// Sends a rendered request to Elasticsearch
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
    ) -> anyhow::Result<ProxyResponse>;
}

#[async_trait]
impl RequestExecutor for KibanaClient {
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
    ) -> anyhow::Result<ProxyResponse> {
        self.console_proxy(method, path, body).await
    }
}

/// Runs workflow instances step by step in background tasks
pub struct Executor {
    store: Arc<WorkflowStore>,
    approvals: Arc<ApprovalStore>,
    alerts: Arc<AlertStore>,
    notifier: Arc<Notifier>,
    requests: Arc<dyn RequestExecutor>,
}

impl Executor {
    pub fn new(
        store: Arc<WorkflowStore>,
        approvals: Arc<ApprovalStore>,
        alerts: Arc<AlertStore>,
        notifier: Arc<Notifier>,
        requests: Arc<dyn RequestExecutor>,
    ) -> Self {
        Self {
            store,
            approvals,
            alerts,
            notifier,
            requests,
        }
    }

    /// Create a manual instance and start running it
    pub fn start(self: &Arc<Self>, new: NewInstance) -> Result<WorkflowInstance, StoreError> {
        let instance = self
            .store
            .create_instance(new, TriggerType::Manual, None, now_millis())?;

        self.spawn(instance.id.clone());

        Ok(instance)
    }

    pub fn retry(self: &Arc<Self>, id: &str) -> Result<WorkflowInstance, StoreError> {
        let instance = self.store.retry(id, now_millis())?;

        tracing::info!("Retrying workflow {} from step {}", id, instance.current_step_index + 1);
        self.spawn(instance.id.clone());

        Ok(instance)
    }

    /// Start the template bound to a freshly approved request, if any
    pub fn on_approved(
        self: &Arc<Self>,
        request: ApprovalRequest,
        operator: &str,
    ) -> Result<ApprovalRequest, StoreError> {
        if request.status != ApprovalStatus::Approved {
            return Ok(request);
        }

        match self.bound_template(&request) {
            Some(template) => {
                self.start_for_approval(&request, &template, operator)?;
                self.approvals.get(&request.id)
            }
            None => Ok(request),
        }
    }

    /// Execute an approved request: through its bound template, or as a manual change
    pub fn execute_approval(
        self: &Arc<Self>,
        id: &str,
        operator: &str,
    ) -> Result<ApprovalRequest, StoreError> {
        let request = self.approvals.get(id)?;

        match self.bound_template(&request) {
            Some(template) => {
                self.start_for_approval(&request, &template, operator)?;
                self.approvals.get(id)
            }
            None => {
                let now = now_millis();
                self.approvals.begin_execution(id, operator, None, now)?;
                self.approvals
                    .finish_execution(id, true, "Executed manually", now)
            }
        }
    }

    fn bound_template(&self, request: &ApprovalRequest) -> Option<WorkflowTemplate> {
        self.store
            .templates_for(request.request_type)
            .into_iter()
            .next()
    }

    fn start_for_approval(
        self: &Arc<Self>,
        request: &ApprovalRequest,
        template: &WorkflowTemplate,
        operator: &str,
    ) -> Result<WorkflowInstance, StoreError> {
        if request.status != ApprovalStatus::Approved || !request.all_approvals_granted() {
            return Err(StoreError::Conflict(format!(
                "Approval '{}' is not ready for execution",
                request.id
            )));
        }

        let now = now_millis();
        let new = NewInstance {
            template_id: template.id.clone(),
            name: format!("{} - auto", request.title),
            description: Some(request.description.clone()).filter(|d| !d.is_empty()),
            variables: request.content_variables(),
            created_by: Some("system".to_string()),
        };
        let instance =
            self.store
                .create_instance(new, TriggerType::Approval, Some(request.id.clone()), now)?;

        if let Err(e) = self
            .approvals
            .begin_execution(&request.id, operator, Some(instance.id.clone()), now)
        {
            if let Err(cancel) = self.store.cancel(&instance.id, now) {
                tracing::warn!(
                    "Unable to cancel workflow {} after approval {} refused execution: {}",
                    instance.id,
                    request.id,
                    cancel
                );
            }
            return Err(e);
        }

        tracing::info!(
            "Approval {} started workflow {} from template {}",
            request.id,
            instance.id,
            template.id
        );

        self.spawn(instance.id.clone());

        Ok(instance)
    }

    pub fn spawn(self: &Arc<Self>, id: String) -> JoinHandle<()> {
        let executor = self.clone();

        tokio::spawn(async move { executor.run(&id).await })
    }

    /// Run pending steps in order until the instance completes, fails or stops running
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, id: &str) {
        loop {
            let next = match self.store.start_next_step(id, now_millis()) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("Workflow {} disappeared: {}", id, e);
                    return;
                }
            };

            let (index, instance) = match next {
                NextStep::Run { index, instance } => (index, instance),
                NextStep::Finished(instance) => {
                    tracing::info!("Workflow {} completed", instance.id);
                    record_instance(Status::Success);
                    self.report(&instance, true, "Workflow completed");
                    return;
                }
                NextStep::Halted(instance) => {
                    tracing::info!("Workflow {} stopped ({:?})", instance.id, instance.status);
                    if instance.status == InstanceStatus::Cancelled {
                        self.report(&instance, false, "Workflow cancelled");
                    }
                    return;
                }
            };

            let step = &instance.steps[index];
            tracing::info!(
                "Workflow {} step {}/{}: {}",
                id,
                index + 1,
                instance.steps.len(),
                step.name
            );

            let started = Instant::now();
            let mut result = match self.execute_step(&instance, step).await {
                Ok(result) => result,
                Err(e) => StepResult {
                    success: false,
                    message: Some(format!("{:#}", e)),
                    ..Default::default()
                },
            };
            result.duration = Some(started.elapsed().as_millis() as u64);

            record_step(step.step_type.as_str(), Status::from(result.success));

            if !result.success {
                tracing::warn!(
                    "Workflow {} step '{}' failed: {}",
                    id,
                    step.name,
                    result.message.as_deref().unwrap_or("unknown error")
                );
            }

            let success = result.success;
            let message = result.message.clone().unwrap_or_default();
            let updated = match self.store.finish_step(id, index, result, now_millis()) {
                Ok(updated) => updated,
                Err(e) => {
                    tracing::error!("Unable to store result of workflow {}: {}", id, e);
                    return;
                }
            };

            if !success && updated.status == InstanceStatus::Failed {
                record_instance(Status::Failure);
                self.report(&updated, false, &format!("Step '{}' failed: {}", step.name, message));
                return;
            }
        }
    }

    async fn execute_step(
        &self,
        instance: &WorkflowInstance,
        step: &WorkflowStep,
    ) -> anyhow::Result<StepResult> {
        let vars = step_variables(&instance.variables, &step.config);

        match step.step_type {
            WorkflowStepType::Approval => self.check_approval(instance),
            WorkflowStepType::Notification => self.notify(instance, &vars).await,
            WorkflowStepType::VerifyData => self.verify_data(&vars).await,
            step_type => self.run_operation(step_type, &vars).await,
        }
    }

    fn check_approval(&self, instance: &WorkflowInstance) -> anyhow::Result<StepResult> {
        let Some(approval_id) = instance.approval_id.as_deref() else {
            anyhow::bail!("Workflow is not linked to an approval request");
        };

        let request = self.approvals.get(approval_id)?;

        match request.status {
            ApprovalStatus::Approved | ApprovalStatus::Processing => Ok(StepResult {
                success: true,
                message: Some(format!("Approval {} granted", approval_id)),
                ..Default::default()
            }),
            status => anyhow::bail!("Approval {} is {:?}", approval_id, status),
        }
    }

    async fn notify(
        &self,
        instance: &WorkflowInstance,
        vars: &Map<String, Value>,
    ) -> anyhow::Result<StepResult> {
        let ids: Vec<&str> = vars
            .get("channels")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let channels = ids
            .iter()
            .map(|id| self.alerts.get_channel(id))
            .collect::<Result<Vec<_>, _>>()?;

        let message = Message::text(
            format!("Workflow {}", instance.name),
            format!(
                "{} of {} steps completed for '{}' ({})",
                instance.completed_steps(),
                instance.steps.len(),
                instance.name,
                instance.template_name
            ),
        );

        if channels.is_empty() {
            tracing::info!("{}: {}", message.title, message.text);
        }

        let mut delivered = 0;
        for channel in channels.iter().filter(|c| c.enabled) {
            match self.notifier.send(channel, &message).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    "Workflow {} notification via '{}' failed: {}",
                    instance.id,
                    channel.name,
                    e
                ),
            }
        }

        Ok(StepResult {
            success: true,
            message: Some(format!("Notified {} of {} channels", delivered, channels.len())),
            data: Some(json!({ "channels": ids, "delivered": delivered })),
            ..Default::default()
        })
    }

    async fn verify_data(&self, vars: &Map<String, Value>) -> anyhow::Result<StepResult> {
        let source = required(vars, "sourceIndex")?;
        let target = required(vars, "targetIndex")?;

        let source_count = self.count(source).await?;
        let target_count = self.count(target).await?;
        let matched = source_count == target_count;

        Ok(StepResult {
            success: matched,
            message: Some(match matched {
                true => format!("Both indices hold {} documents", source_count),
                false => format!(
                    "Document counts differ: {} has {}, {} has {}",
                    source, source_count, target, target_count
                ),
            }),
            data: Some(json!({
                "sourceCount": source_count,
                "targetCount": target_count,
                "match": matched,
            })),
            ..Default::default()
        })
    }

    async fn count(&self, index: &str) -> anyhow::Result<u64> {
        let response = self
            .requests
            .execute(HttpMethod::Get, &format!("/{}/_count", index), None)
            .await?;

        if !response.is_success() {
            anyhow::bail!("Counting '{}' failed with HTTP {}", index, response.status);
        }

        response.body["count"]
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("Count response for '{}' has no count", index))
    }

    async fn run_operation(
        &self,
        step_type: WorkflowStepType,
        vars: &Map<String, Value>,
    ) -> anyhow::Result<StepResult> {
        let Some(operation_type) = step_type.operation_type() else {
            anyhow::bail!("Step type '{}' is not an operation", step_type.as_str());
        };

        let operation_id = vars.get("operationId").and_then(Value::as_str);
        let (api, schema) = match self.store.find_operation(operation_id, operation_type) {
            Some(operation) => (operation.api_config, operation.input_schema),
            None => match step_type {
                WorkflowStepType::CustomApi => (inline_api(vars)?, Schema::new()),
                _ => anyhow::bail!("No operation available for step type '{}'", step_type.as_str()),
            },
        };

        let endpoint = render(&api.endpoint, vars, &schema)?;
        let body = api
            .body
            .as_deref()
            .map(|body| render(body, vars, &schema))
            .transpose()?;

        let response = self
            .requests
            .execute(api.method, &endpoint, body.as_deref())
            .await?;

        let condition = SuccessCondition::parse(api.success_condition.as_deref());
        let success = condition.check(&response);

        Ok(StepResult {
            success,
            message: Some(match success {
                true => format!("{} {} succeeded (HTTP {})", api.method, endpoint, response.status),
                false => format!(
                    "{} {} did not meet its success condition (HTTP {})",
                    api.method, endpoint, response.status
                ),
            }),
            response: Some(response.body),
            ..Default::default()
        })
    }

    /// Tell the linked approval request how its execution ended
    fn report(&self, instance: &WorkflowInstance, success: bool, message: &str) {
        let Some(approval_id) = instance.approval_id.as_deref() else {
            return;
        };

        if let Err(e) = self
            .approvals
            .finish_execution(approval_id, success, message, now_millis())
        {
            tracing::warn!(
                "Unable to record workflow {} outcome on approval {}: {}",
                instance.id,
                approval_id,
                e
            );
        }
    }
}

/// Request described directly in a custom_api step config
fn inline_api(vars: &Map<String, Value>) -> anyhow::Result<ApiConfig> {
    let endpoint = required(vars, "endpoint")?.to_string();
    let method = match vars.get("method").and_then(Value::as_str) {
        Some(method) => method.parse()?,
        None => HttpMethod::Get,
    };
    let body = match vars.get("body") {
        Some(Value::String(body)) => Some(body.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    Ok(ApiConfig {
        method,
        endpoint,
        body,
        headers: None,
        success_condition: vars
            .get("successCondition")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn required<'a>(vars: &'a Map<String, Value>, name: &str) -> Result<&'a str, RenderError> {
    vars.get(name)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RenderError::MissingVariable(name.to_string()))
}
