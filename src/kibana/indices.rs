use crate::kibana::{
    cluster::{ClusterStatus, Health},
    timeseries::TimeSeriesData,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IndexInfo {
    pub name: String,
    pub status: Health,
    pub doc_count: i64,
    pub data_size: i64,
    pub index_rate: Option<f64>,
    pub search_rate: Option<f64>,
    pub unassigned_shards: i64,
    pub status_sort: Option<i64>,
}

/// Reply of `/api/monitoring/v1/clusters/{clusterId}/elasticsearch/indices`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct IndicesResponse {
    pub cluster_status: ClusterStatus,
    pub indices: Vec<IndexInfo>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DataSize {
    pub primaries: Option<i64>,
    pub total: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexSummary {
    pub name: String,
    pub status: Health,
    pub primaries: Option<i64>,
    pub replicas: Option<i64>,
    pub documents: Option<i64>,
    pub data_size: Option<DataSize>,
    pub unassigned_shards: Option<i64>,
    pub total_shards: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ShardInfo {
    pub index: Option<String>,
    pub shard: Option<i64>,
    pub node: Option<String>,
    pub primary: Option<bool>,
    pub relocating_node: Option<String>,
    pub state: Option<String>,
}

/// Reply of `/api/monitoring/v1/clusters/{clusterId}/elasticsearch/indices/{indexName}`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexDetail {
    pub index_summary: Option<IndexSummary>,
    pub metrics: Option<HashMap<String, Vec<TimeSeriesData>>>,
    pub shards: Vec<ShardInfo>,
}
