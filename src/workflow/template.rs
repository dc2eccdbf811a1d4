use crate::{approval::ApprovalRequestType, workflow::operation::AtomicOperationType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a step does: an atomic operation, an approval gate or a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStepType {
    ReadIndexConfig,
    CreateIndex,
    UpdateMapping,
    UpdateSettings,
    Reindex,
    CreateAlias,
    SwitchAlias,
    DeleteAlias,
    DeleteIndex,
    VerifyData,
    BackupIndex,
    CustomApi,
    CustomScript,
    Approval,
    Notification,
}

impl WorkflowStepType {
    pub fn operation_type(&self) -> Option<AtomicOperationType> {
        use AtomicOperationType as Op;

        let op = match self {
            WorkflowStepType::ReadIndexConfig => Op::ReadIndexConfig,
            WorkflowStepType::CreateIndex => Op::CreateIndex,
            WorkflowStepType::UpdateMapping => Op::UpdateMapping,
            WorkflowStepType::UpdateSettings => Op::UpdateSettings,
            WorkflowStepType::Reindex => Op::Reindex,
            WorkflowStepType::CreateAlias => Op::CreateAlias,
            WorkflowStepType::SwitchAlias => Op::SwitchAlias,
            WorkflowStepType::DeleteAlias => Op::DeleteAlias,
            WorkflowStepType::DeleteIndex => Op::DeleteIndex,
            WorkflowStepType::VerifyData => Op::VerifyData,
            WorkflowStepType::BackupIndex => Op::BackupIndex,
            WorkflowStepType::CustomApi => Op::CustomApi,
            WorkflowStepType::CustomScript => Op::CustomScript,
            WorkflowStepType::Approval | WorkflowStepType::Notification => return None,
        };

        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStepType::ReadIndexConfig => "read_index_config",
            WorkflowStepType::CreateIndex => "create_index",
            WorkflowStepType::UpdateMapping => "update_mapping",
            WorkflowStepType::UpdateSettings => "update_settings",
            WorkflowStepType::Reindex => "reindex",
            WorkflowStepType::CreateAlias => "create_alias",
            WorkflowStepType::SwitchAlias => "switch_alias",
            WorkflowStepType::DeleteAlias => "delete_alias",
            WorkflowStepType::DeleteIndex => "delete_index",
            WorkflowStepType::VerifyData => "verify_data",
            WorkflowStepType::BackupIndex => "backup_index",
            WorkflowStepType::CustomApi => "custom_api",
            WorkflowStepType::CustomScript => "custom_script",
            WorkflowStepType::Approval => "approval",
            WorkflowStepType::Notification => "notification",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Index,
    Alias,
    Migration,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: WorkflowStepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Step parameters; strings may reference instance variables as `{{name}}`
    #[serde(default)]
    pub config: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub steps: Vec<TemplateStep>,
    pub is_builtin: bool,
    pub bound_approval_types: Vec<ApprovalRequestType>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: TemplateCategory,
    pub steps: Vec<TemplateStep>,
    #[serde(default)]
    pub bound_approval_types: Vec<ApprovalRequestType>,
}
