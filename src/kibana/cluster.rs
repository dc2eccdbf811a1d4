use crate::kibana::timeseries::TimeSeriesData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Health colour reported by Elasticsearch
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Green,
    Yellow,
    Red,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Health {
    /// Numeric severity used by the alert evaluator: 0 green, 1 yellow, 2 red
    pub fn severity(&self) -> Option<f64> {
        match self {
            Health::Green => Some(0.0),
            Health::Yellow => Some(1.0),
            Health::Red => Some(2.0),
            Health::Unknown => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterStatus {
    pub status: Health,
    pub indices_count: i64,
    pub document_count: i64,
    pub data_size: i64,
    pub nodes_count: i64,
    pub up_time: i64,
    pub version: Vec<String>,
    pub mem_used: i64,
    pub mem_max: i64,
    pub unassigned_shards: i64,
    pub total_shards: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ClusterMetrics {
    pub cluster_search_request_rate: Option<Vec<TimeSeriesData>>,
    pub cluster_query_latency: Option<Vec<TimeSeriesData>>,
    pub cluster_index_request_rate: Option<Vec<TimeSeriesData>>,
    pub cluster_index_latency: Option<Vec<TimeSeriesData>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Logs {
    pub enabled: Option<bool>,
    pub logs: Vec<Value>,
    pub reason: HashMap<String, Value>,
    pub limit: Option<i64>,
}

/// Reply of `/api/monitoring/v1/clusters/{clusterId}/elasticsearch`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterOverview {
    pub cluster_status: ClusterStatus,
    pub metrics: Option<ClusterMetrics>,
    pub logs: Option<Logs>,
    pub shard_activity: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_health_does_not_fail_decoding() {
        let status: ClusterStatus =
            serde_json::from_str(r#"{"status":"purple","nodesCount":3}"#).unwrap();

        assert_eq!(status.status, Health::Unknown);
        assert_eq!(status.nodes_count, 3);
        assert_eq!(status.status.severity(), None);
    }

    #[test]
    fn decodes_cluster_overview() {
        let body = r#"{
            "clusterStatus": {
                "status": "yellow",
                "indicesCount": 12,
                "documentCount": 1000,
                "dataSize": 2048,
                "nodesCount": 3,
                "upTime": 60000,
                "version": ["8.11.0"],
                "memUsed": 512,
                "memMax": 1024,
                "unassignedShards": 2,
                "totalShards": 24
            },
            "metrics": {
                "cluster_search_request_rate": [
                    {"bucket_size": "10 s", "data": [[1700000000000, 1.5], [1700000010000, null]]}
                ]
            },
            "shardActivity": []
        }"#;

        let overview: ClusterOverview = serde_json::from_str(body).unwrap();

        assert_eq!(overview.cluster_status.status, Health::Yellow);
        assert_eq!(overview.cluster_status.status.severity(), Some(1.0));
        assert_eq!(overview.cluster_status.total_shards, 24);

        let metrics = overview.metrics.unwrap();
        let series = &metrics.cluster_search_request_rate.unwrap()[0];
        assert_eq!(series.bucket_size.as_deref(), Some("10 s"));
        assert_eq!(series.data.as_ref().unwrap().len(), 2);
        assert!(metrics.cluster_query_latency.is_none());
    }
}
