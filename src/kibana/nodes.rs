use crate::kibana::{
    cluster::ClusterStatus,
    timeseries::{MetricInfo, MetricSummary, TimeSeriesData},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NodeMetric {
    pub metric: Option<MetricInfo>,
    pub summary: Option<MetricSummary>,
}

impl NodeMetric {
    pub fn last_val(&self) -> Option<f64> {
        self.summary.as_ref().and_then(|s| s.last_val)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeInfo {
    pub name: String,
    pub uuid: String,
    pub is_online: bool,
    pub shard_count: i64,
    #[serde(rename = "transport_address")]
    pub transport_address: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub node_type_label: Option<String>,
    pub node_type_class: Option<String>,
    pub roles: Vec<String>,
    pub resolver: Option<String>,
    #[serde(rename = "node_cgroup_throttled")]
    pub node_cgroup_throttled: Option<NodeMetric>,
    #[serde(rename = "node_cpu_utilization")]
    pub node_cpu_utilization: Option<NodeMetric>,
    #[serde(rename = "node_load_average")]
    pub node_load_average: Option<NodeMetric>,
    #[serde(rename = "node_jvm_mem_percent")]
    pub node_jvm_mem_percent: Option<NodeMetric>,
    #[serde(rename = "node_free_space")]
    pub node_free_space: Option<NodeMetric>,
}

impl NodeInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Reply of `/api/monitoring/v1/clusters/{clusterId}/elasticsearch/nodes`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NodesResponse {
    pub cluster_status: ClusterStatus,
    pub nodes: Vec<NodeInfo>,
    pub total_node_count: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeSummary {
    pub resolver: Option<String>,
    #[serde(rename = "node_ids")]
    pub node_ids: Vec<String>,
    #[serde(rename = "transport_address")]
    pub transport_address: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub node_type_label: Option<String>,
    pub node_type_class: Option<String>,
    pub total_shards: i64,
    pub index_count: i64,
    pub documents: i64,
    pub data_size: i64,
    pub free_space: i64,
    pub total_space: i64,
    pub used_heap: i64,
    pub status: Option<String>,
    pub is_online: bool,
}

/// Reply of `/api/monitoring/v1/clusters/{clusterId}/elasticsearch/nodes/{nodeId}`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeDetail {
    pub node_summary: Option<NodeSummary>,
    pub metrics: Option<HashMap<String, Vec<TimeSeriesData>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_node_with_metric_summaries() {
        let body = r#"{
            "name": "es-node-01",
            "uuid": "n1",
            "isOnline": true,
            "shardCount": 30,
            "transport_address": "10.0.0.1:9300",
            "type": "master",
            "roles": ["master", "data", "ingest"],
            "node_cpu_utilization": {"summary": {"lastVal": 42.7, "slope": 1}},
            "node_free_space": {"summary": {"lastVal": 4000.0}}
        }"#;

        let node: NodeInfo = serde_json::from_str(body).unwrap();

        assert!(node.has_role("data"));
        assert!(!node.has_role("ml"));
        assert_eq!(node.node_type.as_deref(), Some("master"));
        assert_eq!(node.node_cpu_utilization.unwrap().last_val(), Some(42.7));
        assert!(node.node_jvm_mem_percent.is_none());
    }
}
