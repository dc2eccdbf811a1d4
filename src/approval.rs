use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRequestType {
    CreateIndex,
    DeleteIndex,
    UpdateMapping,
    UpdateSettings,
    CreateAlias,
    DeleteAlias,
    UpdateAlias,
    CreateTemplate,
    DeleteTemplate,
    CreatePipeline,
    DeletePipeline,
    Reindex,
    Other,
}

impl ApprovalRequestType {
    pub const ALL: [ApprovalRequestType; 13] = [
        ApprovalRequestType::CreateIndex,
        ApprovalRequestType::DeleteIndex,
        ApprovalRequestType::UpdateMapping,
        ApprovalRequestType::UpdateSettings,
        ApprovalRequestType::CreateAlias,
        ApprovalRequestType::DeleteAlias,
        ApprovalRequestType::UpdateAlias,
        ApprovalRequestType::CreateTemplate,
        ApprovalRequestType::DeleteTemplate,
        ApprovalRequestType::CreatePipeline,
        ApprovalRequestType::DeletePipeline,
        ApprovalRequestType::Reindex,
        ApprovalRequestType::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Processing,
    Completed,
    Failed,
}

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 7] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
        ApprovalStatus::Cancelled,
        ApprovalStatus::Processing,
        ApprovalStatus::Completed,
        ApprovalStatus::Failed,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Approval,
    Notification,
    Execution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_role: Option<String>,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalLog {
    pub id: String,
    pub action: String,
    pub operator: String,
    pub operated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub request_type: ApprovalRequestType,
    pub status: ApprovalStatus,
    pub applicant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_dept: Option<String>,
    pub description: String,
    /// Describes the requested change, e.g. `indexName`, `numberOfShards`, `mappings`
    pub content: Map<String, Value>,
    pub priority: ApprovalPriority,
    pub nodes: Vec<ApprovalNode>,
    pub logs: Vec<ApprovalLog>,
    pub notification_channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl ApprovalRequest {
    /// Top-level scalar fields of the content, used as workflow variables
    pub fn content_variables(&self) -> Map<String, Value> {
        self.content
            .iter()
            .filter(|(_, v)| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn all_approvals_granted(&self) -> bool {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Approval)
            .all(|n| n.status == NodeStatus::Approved)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub assignee: Option<String>,
    pub assignee_role: Option<String>,
}

/// Fields accepted when submitting a request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApprovalRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub request_type: ApprovalRequestType,
    pub applicant: String,
    pub applicant_dept: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub priority: ApprovalPriority,
    /// Defaults to technical review, DBA review and execution
    pub nodes: Option<Vec<NewNode>>,
    #[serde(default)]
    pub notification_channels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_variables_keep_only_scalars() {
        let new: NewApprovalRequest = serde_json::from_value(json!({
            "title": "New index",
            "type": "create_index",
            "applicant": "alice",
            "content": {
                "indexName": "logs-2026",
                "numberOfShards": 5,
                "backupRequired": true,
                "mappings": {"properties": {}},
                "aliases": ["logs"],
                "note": null
            }
        }))
        .unwrap();

        assert_eq!(new.priority, ApprovalPriority::Normal);

        let request = ApprovalRequest {
            id: "approval-1".into(),
            title: new.title,
            request_type: new.request_type,
            status: ApprovalStatus::Pending,
            applicant: new.applicant,
            applicant_dept: None,
            description: new.description,
            content: new.content,
            priority: new.priority,
            nodes: vec![],
            logs: vec![],
            notification_channels: vec![],
            workflow_id: None,
            created_at: 0,
            updated_at: 0,
            completed_at: None,
        };

        let vars = request.content_variables();
        assert_eq!(vars.len(), 3);
        assert_eq!(vars["indexName"], "logs-2026");
        assert_eq!(vars["numberOfShards"], 5);
        assert!(!vars.contains_key("mappings"));
    }
}
