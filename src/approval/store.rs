use crate::{
    approval::{
        ApprovalLog, ApprovalNode, ApprovalRequest, ApprovalRequestType, ApprovalStatus,
        NewApprovalRequest, NewNode, NodeStatus, NodeType,
    },
    error::StoreError,
    new_id,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalFilter {
    pub status: Option<ApprovalStatus>,
    #[serde(rename = "type")]
    pub request_type: Option<ApprovalRequestType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStatistics {
    pub total: usize,
    pub by_status: BTreeMap<ApprovalStatus, usize>,
    pub by_type: BTreeMap<ApprovalRequestType, usize>,
}

/// Approval requests and their review state machine
#[derive(Default)]
pub struct ApprovalStore {
    requests: RwLock<Vec<ApprovalRequest>>,
}

impl ApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests matching the filter, newest first
    pub fn list(&self, filter: &ApprovalFilter) -> Vec<ApprovalRequest> {
        let mut requests: Vec<ApprovalRequest> = self
            .requests
            .read()
            .iter()
            .filter(|r| filter.status.is_none_or(|s| s == r.status))
            .filter(|r| filter.request_type.is_none_or(|t| t == r.request_type))
            .cloned()
            .collect();

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    pub fn get(&self, id: &str) -> Result<ApprovalRequest, StoreError> {
        self.requests
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub fn submit(&self, new: NewApprovalRequest, now: i64) -> Result<ApprovalRequest, StoreError> {
        if new.title.trim().is_empty() {
            return Err(StoreError::Invalid("Title is required".into()));
        }

        let nodes = new
            .nodes
            .unwrap_or_else(default_nodes)
            .into_iter()
            .enumerate()
            .map(|(i, node)| ApprovalNode {
                id: format!("node-{}", i + 1),
                name: node.name,
                node_type: node.node_type,
                assignee: node.assignee,
                assignee_role: node.assignee_role,
                status: NodeStatus::Pending,
                comment: None,
                operated_at: None,
                operated_by: None,
            })
            .collect();

        let mut request = ApprovalRequest {
            id: new_id("approval"),
            title: new.title.trim().to_string(),
            request_type: new.request_type,
            status: ApprovalStatus::Pending,
            applicant: new.applicant,
            applicant_dept: new.applicant_dept,
            description: new.description,
            content: new.content,
            priority: new.priority,
            nodes,
            logs: Vec::new(),
            notification_channels: new.notification_channels,
            workflow_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let applicant = request.applicant.clone();
        push_log(&mut request, "submitted", &applicant, None, now);

        tracing::info!("Approval request {} submitted by {}", request.id, applicant);

        self.requests.write().push(request.clone());

        Ok(request)
    }

    /// Approve the first pending approval node; the request is approved once none remain
    pub fn approve(
        &self,
        id: &str,
        operator: &str,
        comment: Option<String>,
        now: i64,
    ) -> Result<ApprovalRequest, StoreError> {
        self.update(id, now, |request| {
            expect_status(request, ApprovalStatus::Pending, "approved")?;

            if let Some(index) = current_review(request) {
                let node = &mut request.nodes[index];
                operate(node, NodeStatus::Approved, operator, comment.clone(), now);
                let action = format!("{} approved", node.name);
                push_log(request, &action, operator, comment, now);
            }

            if current_review(request).is_none() {
                request.status = ApprovalStatus::Approved;
            }

            Ok(())
        })
    }

    pub fn reject(
        &self,
        id: &str,
        operator: &str,
        comment: &str,
        now: i64,
    ) -> Result<ApprovalRequest, StoreError> {
        if comment.trim().is_empty() {
            return Err(StoreError::Invalid("A reason is required to reject".into()));
        }

        self.update(id, now, |request| {
            expect_status(request, ApprovalStatus::Pending, "rejected")?;

            let comment = Some(comment.trim().to_string());

            if let Some(index) = current_review(request) {
                let node = &mut request.nodes[index];
                operate(node, NodeStatus::Rejected, operator, comment.clone(), now);
                let action = format!("{} rejected", node.name);
                push_log(request, &action, operator, comment, now);
            }

            skip_pending(request);
            request.status = ApprovalStatus::Rejected;

            Ok(())
        })
    }

    pub fn cancel(&self, id: &str, operator: &str, now: i64) -> Result<ApprovalRequest, StoreError> {
        self.update(id, now, |request| {
            expect_status(request, ApprovalStatus::Pending, "cancelled")?;

            skip_pending(request);
            request.status = ApprovalStatus::Cancelled;
            push_log(request, "cancelled", operator, None, now);

            Ok(())
        })
    }

    pub fn begin_execution(
        &self,
        id: &str,
        operator: &str,
        workflow_id: Option<String>,
        now: i64,
    ) -> Result<ApprovalRequest, StoreError> {
        self.update(id, now, |request| {
            expect_status(request, ApprovalStatus::Approved, "executed")?;

            if !request.all_approvals_granted() {
                return Err(StoreError::Conflict(format!(
                    "Approval '{}' still has open reviews",
                    request.id
                )));
            }

            request.status = ApprovalStatus::Processing;
            let comment = workflow_id.as_ref().map(|w| format!("workflow {}", w));
            request.workflow_id = workflow_id;
            push_log(request, "execution started", operator, comment, now);

            Ok(())
        })
    }

    /// Record the outcome of an execution started with [`Self::begin_execution`]
    pub fn finish_execution(
        &self,
        id: &str,
        success: bool,
        message: &str,
        now: i64,
    ) -> Result<ApprovalRequest, StoreError> {
        self.update(id, now, |request| {
            expect_status(request, ApprovalStatus::Processing, "finished")?;

            let outcome = match success {
                true => NodeStatus::Approved,
                false => NodeStatus::Rejected,
            };
            let comment = Some(message.to_string()).filter(|m| !m.is_empty());

            if let Some(node) = request
                .nodes
                .iter_mut()
                .find(|n| n.node_type == NodeType::Execution && n.status == NodeStatus::Pending)
            {
                operate(node, outcome, "system", comment.clone(), now);
            }

            match success {
                true => {
                    request.status = ApprovalStatus::Completed;
                    request.completed_at = Some(now);
                    push_log(request, "execution completed", "system", comment, now);
                }
                false => {
                    request.status = ApprovalStatus::Failed;
                    push_log(request, "execution failed", "system", comment, now);
                }
            }

            Ok(())
        })
    }

    pub fn statistics(&self) -> ApprovalStatistics {
        let requests = self.requests.read();

        let mut by_status: BTreeMap<ApprovalStatus, usize> =
            ApprovalStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_type: BTreeMap<ApprovalRequestType, usize> =
            ApprovalRequestType::ALL.iter().map(|t| (*t, 0)).collect();

        for request in requests.iter() {
            *by_status.entry(request.status).or_default() += 1;
            *by_type.entry(request.request_type).or_default() += 1;
        }

        ApprovalStatistics {
            total: requests.len(),
            by_status,
            by_type,
        }
    }

    fn update<F>(&self, id: &str, now: i64, change: F) -> Result<ApprovalRequest, StoreError>
    where
        F: FnOnce(&mut ApprovalRequest) -> Result<(), StoreError>,
    {
        let mut requests = self.requests.write();
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;

        change(request)?;
        request.updated_at = now;

        Ok(request.clone())
    }
}

fn default_nodes() -> Vec<NewNode> {
    let node = |name: &str, node_type: NodeType, role: Option<&str>| NewNode {
        name: name.to_string(),
        node_type,
        assignee: None,
        assignee_role: role.map(str::to_string),
    };

    vec![
        node("Technical review", NodeType::Approval, Some("tech-lead")),
        node("DBA review", NodeType::Approval, Some("dba")),
        node("Execution", NodeType::Execution, None),
    ]
}

/// Index of the first approval node still waiting for a decision
fn current_review(request: &ApprovalRequest) -> Option<usize> {
    request
        .nodes
        .iter()
        .position(|n| n.node_type == NodeType::Approval && n.status == NodeStatus::Pending)
}

fn expect_status(
    request: &ApprovalRequest,
    expected: ApprovalStatus,
    action: &str,
) -> Result<(), StoreError> {
    match request.status == expected {
        true => Ok(()),
        false => Err(StoreError::Conflict(format!(
            "Approval '{}' is {:?} and cannot be {}",
            request.id, request.status, action
        ))),
    }
}

fn operate(
    node: &mut ApprovalNode,
    status: NodeStatus,
    operator: &str,
    comment: Option<String>,
    now: i64,
) {
    node.status = status;
    node.operated_by = Some(operator.to_string());
    node.operated_at = Some(now);
    node.comment = comment;
}

fn skip_pending(request: &mut ApprovalRequest) {
    request
        .nodes
        .iter_mut()
        .filter(|n| n.status == NodeStatus::Pending)
        .for_each(|n| n.status = NodeStatus::Skipped);
}

fn push_log(
    request: &mut ApprovalRequest,
    action: &str,
    operator: &str,
    comment: Option<String>,
    now: i64,
) {
    let id = format!("log-{}", request.logs.len() + 1);

    request.logs.push(ApprovalLog {
        id,
        action: action.to_string(),
        operator: operator.to_string(),
        operated_at: now,
        comment,
    });
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("Approval '{}'", id))
}
