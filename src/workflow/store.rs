use crate::{
    approval::ApprovalRequestType,
    error::StoreError,
    new_id,
    workflow::{
        builtins,
        instance::{
            ExecutionRecord, InstanceStatus, NewInstance, StepResult, StepStatus, TriggerType,
            WorkflowInstance, WorkflowStep,
        },
        operation::{AtomicOperation, AtomicOperationType, NewOperation},
        template::{NewTemplate, WorkflowTemplate},
    },
};
use parking_lot::RwLock;

/// What the executor should do next with an instance
#[derive(Debug)]
pub enum NextStep {
    /// The step at `index` was marked running
    Run {
        index: usize,
        instance: WorkflowInstance,
    },
    /// Every step completed and the instance is now completed
    Finished(WorkflowInstance),
    /// The instance is no longer running
    Halted(WorkflowInstance),
}

#[derive(Default)]
struct Inner {
    operations: Vec<AtomicOperation>,
    templates: Vec<WorkflowTemplate>,
    instances: Vec<WorkflowInstance>,
}

/// Atomic operations, templates and workflow instances
#[derive(Default)]
pub struct WorkflowStore {
    inner: RwLock<Inner>,
}

impl WorkflowStore {
    /// Store seeded with the builtin operations and templates
    pub fn new(now: i64) -> Self {
        let inner = Inner {
            operations: builtins::operations(now),
            templates: builtins::templates(now),
            instances: Vec::new(),
        };

        Self {
            inner: RwLock::new(inner),
        }
    }

    pub fn list_operations(&self) -> Vec<AtomicOperation> {
        self.inner.read().operations.clone()
    }

    pub fn get_operation(&self, id: &str) -> Result<AtomicOperation, StoreError> {
        self.inner
            .read()
            .operations
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| not_found("Operation", id))
    }

    /// The operation a step runs: the one named by id, else the first of the step's type
    pub fn find_operation(
        &self,
        id: Option<&str>,
        operation_type: AtomicOperationType,
    ) -> Option<AtomicOperation> {
        let inner = self.inner.read();

        id.and_then(|id| inner.operations.iter().find(|o| o.id == id))
            .or_else(|| {
                inner
                    .operations
                    .iter()
                    .find(|o| o.operation_type == operation_type)
            })
            .cloned()
    }

    pub fn create_operation(&self, new: NewOperation, now: i64) -> Result<AtomicOperation, StoreError> {
        validate_operation(&new)?;

        let operation = AtomicOperation {
            id: new_id("op"),
            name: new.name.trim().to_string(),
            operation_type: new.operation_type,
            description: new.description,
            api_config: new.api_config,
            input_schema: new.input_schema,
            output_schema: new.output_schema,
            is_builtin: false,
            created_at: now,
            updated_at: None,
        };

        self.inner.write().operations.push(operation.clone());

        Ok(operation)
    }

    pub fn update_operation(
        &self,
        id: &str,
        new: NewOperation,
        now: i64,
    ) -> Result<AtomicOperation, StoreError> {
        validate_operation(&new)?;

        let mut inner = self.inner.write();
        let operation = inner
            .operations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| not_found("Operation", id))?;

        operation.name = new.name.trim().to_string();
        operation.operation_type = new.operation_type;
        operation.description = new.description;
        operation.api_config = new.api_config;
        operation.input_schema = new.input_schema;
        operation.output_schema = new.output_schema;
        operation.updated_at = Some(now);

        Ok(operation.clone())
    }

    pub fn delete_operation(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let index = inner
            .operations
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| not_found("Operation", id))?;

        if inner.operations[index].is_builtin {
            return Err(StoreError::Conflict(format!(
                "Builtin operation '{}' cannot be deleted",
                id
            )));
        }

        inner.operations.remove(index);

        Ok(())
    }

    pub fn list_templates(&self) -> Vec<WorkflowTemplate> {
        self.inner.read().templates.clone()
    }

    pub fn get_template(&self, id: &str) -> Result<WorkflowTemplate, StoreError> {
        self.inner
            .read()
            .templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found("Template", id))
    }

    pub fn create_template(&self, new: NewTemplate, now: i64) -> Result<WorkflowTemplate, StoreError> {
        validate_template(&new)?;

        let template = WorkflowTemplate {
            id: new_id("tpl"),
            name: new.name.trim().to_string(),
            description: new.description,
            category: new.category,
            steps: new.steps,
            is_builtin: false,
            bound_approval_types: new.bound_approval_types,
            created_at: now,
            updated_at: now,
        };

        self.inner.write().templates.push(template.clone());

        Ok(template)
    }

    pub fn update_template(
        &self,
        id: &str,
        new: NewTemplate,
        now: i64,
    ) -> Result<WorkflowTemplate, StoreError> {
        validate_template(&new)?;

        self.update_template_with(id, now, |template| {
            template.name = new.name.trim().to_string();
            template.description = new.description;
            template.category = new.category;
            template.steps = new.steps;
            template.bound_approval_types = new.bound_approval_types;
        })
    }

    pub fn delete_template(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let index = inner
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found("Template", id))?;

        if inner.templates[index].is_builtin {
            return Err(StoreError::Conflict(format!(
                "Builtin template '{}' cannot be deleted",
                id
            )));
        }

        inner.templates.remove(index);

        Ok(())
    }

    /// Replace the approval types that start this template automatically
    pub fn bind(
        &self,
        id: &str,
        approval_types: Vec<ApprovalRequestType>,
        now: i64,
    ) -> Result<WorkflowTemplate, StoreError> {
        let mut approval_types = approval_types;
        approval_types.sort();
        approval_types.dedup();

        self.update_template_with(id, now, |template| {
            template.bound_approval_types = approval_types;
        })
    }

    /// Templates bound to an approval type, in creation order
    pub fn templates_for(&self, approval_type: ApprovalRequestType) -> Vec<WorkflowTemplate> {
        self.inner
            .read()
            .templates
            .iter()
            .filter(|t| t.bound_approval_types.contains(&approval_type))
            .cloned()
            .collect()
    }

    /// Instances, newest first
    pub fn list_instances(&self) -> Vec<WorkflowInstance> {
        let mut instances = self.inner.read().instances.clone();
        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        instances
    }

    pub fn get_instance(&self, id: &str) -> Result<WorkflowInstance, StoreError> {
        self.inner
            .read()
            .instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| not_found("Workflow", id))
    }

    /// Copy a template into a new running instance with every step pending
    pub fn create_instance(
        &self,
        new: NewInstance,
        trigger_type: TriggerType,
        approval_id: Option<String>,
        now: i64,
    ) -> Result<WorkflowInstance, StoreError> {
        let template = self.get_template(&new.template_id)?;

        if template.steps.is_empty() {
            return Err(StoreError::Invalid(format!(
                "Template '{}' has no steps",
                template.id
            )));
        }

        let steps = template
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| WorkflowStep {
                id: format!("s{}", i + 1),
                name: step.name.clone(),
                step_type: step.step_type,
                description: step.description.clone(),
                config: step.config.clone(),
                status: StepStatus::Pending,
                result: None,
                started_at: None,
                completed_at: None,
                error: None,
                retry_count: 0,
            })
            .collect();

        let name = match new.name.trim() {
            "" => template.name.clone(),
            name => name.to_string(),
        };

        let instance = WorkflowInstance {
            id: new_id("wf"),
            template_id: template.id,
            template_name: template.name,
            name,
            description: new.description,
            status: InstanceStatus::Running,
            current_step_index: 0,
            progress: 0,
            trigger_type,
            variables: new.variables,
            steps,
            approval_id,
            created_by: new.created_by.unwrap_or_else(|| "admin".to_string()),
            created_at: now,
            started_at: Some(now),
            updated_at: now,
            completed_at: None,
        };

        tracing::info!(
            "Workflow {} created from template {} ({:?})",
            instance.id,
            instance.template_id,
            instance.trigger_type
        );

        self.inner.write().instances.push(instance.clone());

        Ok(instance)
    }

    pub fn cancel(&self, id: &str, now: i64) -> Result<WorkflowInstance, StoreError> {
        self.update_instance(id, now, |instance| {
            if !matches!(
                instance.status,
                InstanceStatus::Running | InstanceStatus::PendingApproval | InstanceStatus::Approved
            ) {
                return Err(StoreError::Conflict(format!(
                    "Workflow '{}' is {:?} and cannot be cancelled",
                    instance.id, instance.status
                )));
            }

            skip_pending(instance);
            instance.status = InstanceStatus::Cancelled;
            instance.completed_at = Some(now);

            Ok(())
        })
    }

    /// Put a failed instance back to running from its failed step
    pub fn retry(&self, id: &str, now: i64) -> Result<WorkflowInstance, StoreError> {
        self.update_instance(id, now, |instance| {
            if instance.status != InstanceStatus::Failed {
                return Err(StoreError::Conflict(format!(
                    "Only failed workflows can be retried, '{}' is {:?}",
                    instance.id, instance.status
                )));
            }

            let failed = instance
                .steps
                .iter()
                .position(|s| s.status == StepStatus::Failed)
                .ok_or_else(|| {
                    StoreError::Conflict(format!("Workflow '{}' has no failed step", instance.id))
                })?;

            let step = &mut instance.steps[failed];
            step.status = StepStatus::Pending;
            step.error = None;
            step.result = None;
            step.started_at = None;
            step.completed_at = None;
            step.retry_count += 1;

            for step in instance.steps.iter_mut().skip(failed + 1) {
                if step.status == StepStatus::Skipped {
                    step.status = StepStatus::Pending;
                }
            }

            instance.status = InstanceStatus::Running;
            instance.current_step_index = failed;
            instance.completed_at = None;

            Ok(())
        })
    }

    /// Mark the first pending step running, or complete the instance when none remain
    pub fn start_next_step(&self, id: &str, now: i64) -> Result<NextStep, StoreError> {
        let mut inner = self.inner.write();
        let instance = inner
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("Workflow", id))?;

        if instance.status != InstanceStatus::Running {
            return Ok(NextStep::Halted(instance.clone()));
        }

        instance.updated_at = now;

        let Some(index) = instance
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
        else {
            instance.status = InstanceStatus::Completed;
            instance.progress = 100;
            instance.completed_at = Some(now);
            return Ok(NextStep::Finished(instance.clone()));
        };

        let step = &mut instance.steps[index];
        step.status = StepStatus::Running;
        step.started_at = Some(now);
        instance.current_step_index = index;

        Ok(NextStep::Run {
            index,
            instance: instance.clone(),
        })
    }

    /// Store a step outcome; a failed step fails the instance and skips what remains
    pub fn finish_step(
        &self,
        id: &str,
        index: usize,
        result: StepResult,
        now: i64,
    ) -> Result<WorkflowInstance, StoreError> {
        self.update_instance(id, now, |instance| {
            let step = instance
                .steps
                .get_mut(index)
                .ok_or_else(|| StoreError::Invalid(format!("Step {} does not exist", index)))?;

            step.completed_at = Some(now);
            step.status = match result.success {
                true => StepStatus::Completed,
                false => StepStatus::Failed,
            };
            step.error = match result.success {
                true => None,
                false => result.message.clone(),
            };
            step.result = Some(result.clone());

            instance.update_progress();

            if !result.success && instance.status == InstanceStatus::Running {
                skip_pending(instance);
                instance.status = InstanceStatus::Failed;
                instance.completed_at = Some(now);
            }

            Ok(())
        })
    }

    /// Everything that actually ran, newest first
    pub fn execution_records(&self) -> Vec<ExecutionRecord> {
        self.list_instances()
            .iter()
            .filter(|i| {
                !matches!(
                    i.status,
                    InstanceStatus::PendingApproval | InstanceStatus::Draft
                )
            })
            .map(ExecutionRecord::from)
            .collect()
    }

    fn update_template_with<F>(&self, id: &str, now: i64, change: F) -> Result<WorkflowTemplate, StoreError>
    where
        F: FnOnce(&mut WorkflowTemplate),
    {
        let mut inner = self.inner.write();
        let template = inner
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Template", id))?;

        change(template);
        template.updated_at = now;

        Ok(template.clone())
    }

    fn update_instance<F>(&self, id: &str, now: i64, change: F) -> Result<WorkflowInstance, StoreError>
    where
        F: FnOnce(&mut WorkflowInstance) -> Result<(), StoreError>,
    {
        let mut inner = self.inner.write();
        let instance = inner
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("Workflow", id))?;

        change(instance)?;
        instance.updated_at = now;

        Ok(instance.clone())
    }
}

fn skip_pending(instance: &mut WorkflowInstance) {
    for step in instance.steps.iter_mut() {
        if step.status == StepStatus::Pending {
            step.status = StepStatus::Skipped;
        }
    }
}

fn validate_operation(new: &NewOperation) -> Result<(), StoreError> {
    if new.name.trim().is_empty() {
        return Err(StoreError::Invalid("Operation name is required".into()));
    }

    if new.api_config.endpoint.trim().is_empty() {
        return Err(StoreError::Invalid("Operation endpoint is required".into()));
    }

    Ok(())
}

fn validate_template(new: &NewTemplate) -> Result<(), StoreError> {
    if new.name.trim().is_empty() {
        return Err(StoreError::Invalid("Template name is required".into()));
    }

    if new.steps.is_empty() {
        return Err(StoreError::Invalid("A template needs at least one step".into()));
    }

    Ok(())
}

fn not_found(kind: &str, id: &str) -> StoreError {
    StoreError::NotFound(format!("{} '{}'", kind, id))
}
