use crate::{
    kibana::{
        cluster::{ClusterOverview, Health},
        nodes::NodesResponse,
    },
    monitor::series::{SeriesMap, convert_time_series, first_series},
};
use serde::Serialize;

/// Dashboard summary assembled from the cluster overview and the node list
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringOverview {
    pub cluster: ClusterInfo,
    pub nodes: NodesInfo,
    pub indices: IndicesInfo,
    pub shards: ShardsInfo,
    pub jvm: JvmInfo,
    pub os: OsInfo,
    pub fs: FsInfo,
    pub time_series: SeriesMap,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: String,
    pub uuid: String,
    pub status: Health,
    pub version: String,
    pub up_time: i64,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodesInfo {
    pub total: i64,
    pub successful: i64,
    pub data: i64,
    pub master: i64,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IndicesInfo {
    pub total: i64,
    pub docs: i64,
    pub store_size_bytes: i64,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShardsInfo {
    pub total: i64,
    pub primaries: i64,
    pub unassigned: i64,
    pub relocating: i64,
    pub initializing: i64,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct JvmInfo {
    pub heap_used_percent: i64,
    pub heap_used_bytes: i64,
    pub heap_max_bytes: i64,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct OsInfo {
    pub cpu_percent: i64,
    pub mem_used_percent: i64,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FsInfo {
    pub total_bytes: i64,
    pub available_bytes: i64,
    pub used_percent: i64,
}

/// Kibana's node list only reports free space; total is estimated assuming 60% usage
const ASSUMED_FREE_RATIO: f64 = 0.4;

impl MonitoringOverview {
    pub fn build(cluster_id: &str, overview: &ClusterOverview, nodes: &NodesResponse) -> Self {
        let status = &overview.cluster_status;

        let cluster = ClusterInfo {
            // The monitoring API does not expose the cluster name
            name: "elasticsearch".to_string(),
            uuid: cluster_id.to_string(),
            status: status.status,
            version: status
                .version
                .first()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            up_time: status.up_time,
        };

        let node_list = &nodes.nodes;
        let nodes_info = NodesInfo {
            total: status.nodes_count,
            successful: status.nodes_count,
            data: node_list.iter().filter(|n| n.has_role("data")).count() as i64,
            master: node_list.iter().filter(|n| n.has_role("master")).count() as i64,
        };

        let indices = IndicesInfo {
            total: status.indices_count,
            docs: status.document_count,
            store_size_bytes: status.data_size,
        };

        let shards = ShardsInfo {
            total: status.total_shards,
            primaries: status.total_shards / 2,
            unassigned: status.unassigned_shards,
            relocating: 0,
            initializing: 0,
        };

        let heap_used_percent = match status.mem_max {
            max if max > 0 => status.mem_used * 100 / max,
            _ => 0,
        };
        let jvm = JvmInfo {
            heap_used_percent,
            heap_used_bytes: status.mem_used,
            heap_max_bytes: status.mem_max,
        };

        let cpu: Vec<i64> = node_list
            .iter()
            .filter_map(|n| n.node_cpu_utilization.as_ref()?.last_val())
            .map(|v| v as i64)
            .collect();
        let os = OsInfo {
            cpu_percent: match cpu.len() {
                0 => 0,
                count => cpu.iter().sum::<i64>() / count as i64,
            },
            mem_used_percent: heap_used_percent,
        };

        let (total_bytes, available_bytes) = node_list
            .iter()
            .filter_map(|n| n.node_free_space.as_ref()?.last_val())
            .fold((0i64, 0i64), |(total, free), last| {
                (total + (last / ASSUMED_FREE_RATIO) as i64, free + last as i64)
            });
        let fs = FsInfo {
            total_bytes,
            available_bytes,
            used_percent: match total_bytes {
                total if total > 0 => (total - available_bytes) * 100 / total,
                _ => 0,
            },
        };

        let mut time_series = SeriesMap::new();
        if let Some(metrics) = overview.metrics.as_ref() {
            let wanted = [
                ("search_rate", &metrics.cluster_search_request_rate),
                ("indexing_rate", &metrics.cluster_index_request_rate),
                ("query_latency", &metrics.cluster_query_latency),
                ("index_latency", &metrics.cluster_index_latency),
            ];

            for (key, series) in wanted {
                if let Some(first) = first_series(series.as_ref()) {
                    time_series.insert(key.to_string(), convert_time_series(first));
                }
            }
        }

        Self {
            cluster,
            nodes: nodes_info,
            indices,
            shards,
            jvm,
            os,
            fs,
            time_series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cluster_overview() -> ClusterOverview {
        serde_json::from_value(json!({
            "clusterStatus": {
                "status": "green",
                "indicesCount": 10,
                "documentCount": 5000,
                "dataSize": 1048576,
                "nodesCount": 3,
                "upTime": 3600000,
                "version": ["8.11.0", "8.10.4"],
                "memUsed": 300,
                "memMax": 1000,
                "unassignedShards": 1,
                "totalShards": 21
            },
            "metrics": {
                "cluster_search_request_rate": [{"data": [[1000, 2.5]]}],
                "cluster_index_latency": [{"data": [[1000, 0.7], [2000, 0.9]]}],
                "cluster_query_latency": []
            }
        }))
        .unwrap()
    }

    fn nodes() -> NodesResponse {
        serde_json::from_value(json!({
            "nodes": [
                {
                    "name": "a",
                    "roles": ["master", "data"],
                    "node_cpu_utilization": {"summary": {"lastVal": 40.9}},
                    "node_free_space": {"summary": {"lastVal": 400.0}}
                },
                {
                    "name": "b",
                    "roles": ["data"],
                    "node_cpu_utilization": {"summary": {"lastVal": 21.2}},
                    "node_free_space": {"summary": {"lastVal": 200.0}}
                },
                {
                    "name": "c",
                    "roles": ["master"]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn derives_cluster_and_node_counts() {
        let overview = MonitoringOverview::build("uuid-1", &cluster_overview(), &nodes());

        assert_eq!(overview.cluster.name, "elasticsearch");
        assert_eq!(overview.cluster.uuid, "uuid-1");
        assert_eq!(overview.cluster.version, "8.11.0");
        assert_eq!(overview.cluster.status, Health::Green);
        assert_eq!(overview.nodes.total, 3);
        assert_eq!(overview.nodes.successful, 3);
        assert_eq!(overview.nodes.data, 2);
        assert_eq!(overview.nodes.master, 2);
        assert_eq!(overview.indices.store_size_bytes, 1048576);
    }

    #[test]
    fn estimates_shards_heap_cpu_and_disk() {
        let overview = MonitoringOverview::build("uuid-1", &cluster_overview(), &nodes());

        assert_eq!(overview.shards.primaries, 10);
        assert_eq!(overview.shards.unassigned, 1);
        assert_eq!(overview.jvm.heap_used_percent, 30);
        assert_eq!(overview.os.mem_used_percent, 30);
        // (40 + 21) / 2 with truncation at each step
        assert_eq!(overview.os.cpu_percent, 30);
        assert_eq!(overview.fs.available_bytes, 600);
        assert_eq!(overview.fs.total_bytes, 1500);
        assert_eq!(overview.fs.used_percent, 60);
    }

    #[test]
    fn picks_first_series_per_metric_and_skips_empty_ones() {
        let overview = MonitoringOverview::build("uuid-1", &cluster_overview(), &nodes());

        assert_eq!(overview.time_series.len(), 2);
        assert_eq!(overview.time_series["search_rate"][0].value, 2.5);
        assert_eq!(overview.time_series["index_latency"].len(), 2);
        assert!(!overview.time_series.contains_key("query_latency"));
    }

    #[test]
    fn empty_inputs_do_not_divide_by_zero() {
        let overview = MonitoringOverview::build(
            "uuid-1",
            &ClusterOverview::default(),
            &NodesResponse::default(),
        );

        assert_eq!(overview.cluster.version, "unknown");
        assert_eq!(overview.jvm.heap_used_percent, 0);
        assert_eq!(overview.os.cpu_percent, 0);
        assert_eq!(overview.fs.used_percent, 0);
        assert!(overview.time_series.is_empty());
    }
}
