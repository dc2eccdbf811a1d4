use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMetricType {
    ClusterHealth,
    NodeCpu,
    NodeHeap,
    NodeDisk,
    NodeMemory,
    IndexDocs,
    IndexSize,
    SearchLatency,
    IndexingLatency,
    GcTime,
    ThreadPoolRejected,
    CircuitBreakerTripped,
    UnassignedShards,
}

impl AlertMetricType {
    pub const ALL: [AlertMetricType; 13] = [
        AlertMetricType::ClusterHealth,
        AlertMetricType::NodeCpu,
        AlertMetricType::NodeHeap,
        AlertMetricType::NodeDisk,
        AlertMetricType::NodeMemory,
        AlertMetricType::IndexDocs,
        AlertMetricType::IndexSize,
        AlertMetricType::SearchLatency,
        AlertMetricType::IndexingLatency,
        AlertMetricType::GcTime,
        AlertMetricType::ThreadPoolRejected,
        AlertMetricType::CircuitBreakerTripped,
        AlertMetricType::UnassignedShards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertMetricType::ClusterHealth => "cluster_health",
            AlertMetricType::NodeCpu => "node_cpu",
            AlertMetricType::NodeHeap => "node_heap",
            AlertMetricType::NodeDisk => "node_disk",
            AlertMetricType::NodeMemory => "node_memory",
            AlertMetricType::IndexDocs => "index_docs",
            AlertMetricType::IndexSize => "index_size",
            AlertMetricType::SearchLatency => "search_latency",
            AlertMetricType::IndexingLatency => "indexing_latency",
            AlertMetricType::GcTime => "gc_time",
            AlertMetricType::ThreadPoolRejected => "thread_pool_rejected",
            AlertMetricType::CircuitBreakerTripped => "circuit_breaker_tripped",
            AlertMetricType::UnassignedShards => "unassigned_shards",
        }
    }

    /// Name used in alert messages
    pub fn label(&self) -> &'static str {
        match self {
            AlertMetricType::ClusterHealth => "cluster health",
            AlertMetricType::NodeCpu => "CPU usage",
            AlertMetricType::NodeHeap => "JVM heap usage",
            AlertMetricType::NodeDisk => "disk usage",
            AlertMetricType::NodeMemory => "memory usage",
            AlertMetricType::IndexDocs => "document count",
            AlertMetricType::IndexSize => "index size",
            AlertMetricType::SearchLatency => "search latency",
            AlertMetricType::IndexingLatency => "indexing latency",
            AlertMetricType::GcTime => "GC time",
            AlertMetricType::ThreadPoolRejected => "thread pool rejections",
            AlertMetricType::CircuitBreakerTripped => "circuit breaker trips",
            AlertMetricType::UnassignedShards => "unassigned shards",
        }
    }

    /// Whether sampling this metric needs the index listing
    pub fn needs_indices(&self) -> bool {
        matches!(self, AlertMetricType::IndexDocs | AlertMetricType::IndexSize)
    }
}

impl std::fmt::Display for AlertMetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl AlertOperator {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            AlertOperator::Gt => value > threshold,
            AlertOperator::Gte => value >= threshold,
            AlertOperator::Lt => value < threshold,
            AlertOperator::Lte => value <= threshold,
            AlertOperator::Eq => value == threshold,
            AlertOperator::Neq => value != threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AlertOperator::Gt => ">",
            AlertOperator::Gte => ">=",
            AlertOperator::Lt => "<",
            AlertOperator::Lte => "<=",
            AlertOperator::Eq => "==",
            AlertOperator::Neq => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl AlertSeverity {
    pub const ALL: [AlertSeverity; 3] = [
        AlertSeverity::Critical,
        AlertSeverity::Warning,
        AlertSeverity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub metric: AlertMetricType,
    pub operator: AlertOperator,
    pub threshold: f64,
    /// Seconds the condition must hold before firing
    pub duration: i64,
    pub severity: AlertSeverity,
    /// Node or index names; empty applies to every target
    pub targets: Vec<String>,
    pub notification_channels: Vec<String>,
    /// Minimum seconds between two firings of the same rule and target
    pub cooldown: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AlertRule {
    pub fn applies_to(&self, target: Option<&str>) -> bool {
        match target {
            _ if self.targets.is_empty() => true,
            Some(target) => self.targets.iter().any(|t| t == target),
            None => false,
        }
    }
}

fn enabled() -> bool {
    true
}

/// Rule fields accepted on create and update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub metric: AlertMetricType,
    pub operator: AlertOperator,
    pub threshold: f64,
    #[serde(default)]
    pub duration: i64,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub notification_channels: Vec<String>,
    #[serde(default)]
    pub cooldown: i64,
}

impl NewRule {
    pub(crate) fn into_rule(self, id: String, created_at: i64, updated_at: i64) -> AlertRule {
        AlertRule {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            enabled: self.enabled,
            metric: self.metric,
            operator: self.operator,
            threshold: self.threshold,
            duration: self.duration,
            severity: self.severity,
            targets: self.targets,
            notification_channels: self.notification_channels,
            cooldown: self.cooldown,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_compare_against_threshold() {
        assert!(AlertOperator::Gt.holds(86.0, 85.0));
        assert!(!AlertOperator::Gt.holds(85.0, 85.0));
        assert!(AlertOperator::Gte.holds(85.0, 85.0));
        assert!(AlertOperator::Lt.holds(1.0, 2.0));
        assert!(AlertOperator::Lte.holds(2.0, 2.0));
        assert!(AlertOperator::Eq.holds(0.0, 0.0));
        assert!(AlertOperator::Neq.holds(1.0, 0.0));
    }

    #[test]
    fn empty_targets_apply_everywhere() {
        let rule: NewRule = serde_json::from_value(serde_json::json!({
            "name": "cpu",
            "metric": "node_cpu",
            "operator": "gt",
            "threshold": 80,
            "severity": "warning"
        }))
        .unwrap();
        let mut rule = rule.into_rule("rule-1".into(), 0, 0);

        assert!(rule.applies_to(None));
        assert!(rule.applies_to(Some("es-node-01")));

        rule.targets = vec!["es-node-02".into()];
        assert!(!rule.applies_to(Some("es-node-01")));
        assert!(rule.applies_to(Some("es-node-02")));
        assert!(!rule.applies_to(None));
    }

    #[test]
    fn metric_names_are_snake_case() {
        let json = serde_json::to_string(&AlertMetricType::CircuitBreakerTripped).unwrap();

        assert_eq!(json, "\"circuit_breaker_tripped\"");
        assert_eq!(AlertMetricType::CircuitBreakerTripped.as_str(), "circuit_breaker_tripped");
        assert!(AlertMetricType::IndexSize.needs_indices());
        assert!(!AlertMetricType::NodeCpu.needs_indices());
    }
}
