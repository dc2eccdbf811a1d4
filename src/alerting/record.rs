use crate::alerting::{
    channel::ChannelType,
    rule::{AlertMetricType, AlertSeverity},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
    Acknowledged,
}

impl AlertStatus {
    /// Firing and acknowledged alerts still block a new firing for the same key
    pub fn is_active(&self) -> bool {
        matches!(self, AlertStatus::Firing | AlertStatus::Acknowledged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAttempt {
    pub channel_id: String,
    pub channel_type: ChannelType,
    pub sent_at: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub metric: AlertMetricType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub fired_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    pub notifications_sent: Vec<NotificationAttempt>,
}

/// Optional filters for listing records
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub rule_id: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AlertRecord) -> bool {
        self.status.is_none_or(|s| s == record.status)
            && self.severity.is_none_or(|s| s == record.severity)
            && self.rule_id.as_deref().is_none_or(|id| id == record.rule_id)
    }
}
