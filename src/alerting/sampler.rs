use crate::{
    alerting::rule::{AlertMetricType, AlertRule},
    kibana::{cluster::ClusterOverview, indices::IndicesResponse, nodes::NodesResponse},
    monitor::{
        IndicesQuery, MonitorService,
        overview::MonitoringOverview,
        time_range::{Pagination, TimeRange},
    },
};

/// Indices fetched per evaluation when an index rule is enabled
const INDEX_PAGE_SIZE: u32 = 500;

/// Nodes requested per page while sampling
const NODE_PAGE_SIZE: u32 = 100;

/// Minutes of monitoring data considered by one evaluation
const SAMPLE_WINDOW_MINUTES: i64 = 10;

/// One observed value of a metric, optionally for a node or index
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: AlertMetricType,
    pub target: Option<String>,
    pub value: f64,
}

impl Sample {
    fn cluster(metric: AlertMetricType, value: f64) -> Self {
        Self {
            metric,
            target: None,
            value,
        }
    }

    fn of(metric: AlertMetricType, target: &str, value: f64) -> Self {
        Self {
            metric,
            target: Some(target.to_string()),
            value,
        }
    }
}

/// Raw monitoring data one evaluation works from
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub overview: ClusterOverview,
    pub nodes: NodesResponse,
    pub indices: Option<IndicesResponse>,
}

impl Snapshot {
    /// Fetch what the enabled rules need; indices only when an index rule is enabled
    #[tracing::instrument(skip_all)]
    pub async fn collect(monitor: &MonitorService, rules: &[AlertRule]) -> anyhow::Result<Self> {
        let range = TimeRange::last_minutes(SAMPLE_WINDOW_MINUTES);

        let range_ref = &range;
        let (overview, nodes) = tokio::try_join!(
            monitor.cluster_overview(range_ref),
            all_nodes(move |page| monitor.nodes(range_ref, page))
        )?;

        let needs_indices = rules.iter().any(|r| r.enabled && r.metric.needs_indices());
        let indices = match needs_indices {
            true => {
                let query = IndicesQuery {
                    pagination: Pagination {
                        index: 0,
                        size: INDEX_PAGE_SIZE,
                    },
                    ..Default::default()
                };

                Some(monitor.indices(&range, &query).await?)
            }
            false => None,
        };

        Ok(Self {
            overview,
            nodes,
            indices,
        })
    }

    pub fn samples(&self, cluster_id: &str) -> Vec<Sample> {
        let status = &self.overview.cluster_status;
        let summary = MonitoringOverview::build(cluster_id, &self.overview, &self.nodes);

        let mut samples = Vec::new();

        if let Some(health) = status.status.severity() {
            samples.push(Sample::cluster(AlertMetricType::ClusterHealth, health));
        }

        samples.push(Sample::cluster(
            AlertMetricType::UnassignedShards,
            status.unassigned_shards as f64,
        ));
        samples.push(Sample::cluster(
            AlertMetricType::NodeMemory,
            summary.os.mem_used_percent as f64,
        ));
        samples.push(Sample::cluster(
            AlertMetricType::NodeDisk,
            summary.fs.used_percent as f64,
        ));

        let latencies = [
            (AlertMetricType::SearchLatency, "query_latency"),
            (AlertMetricType::IndexingLatency, "index_latency"),
        ];
        for (metric, key) in latencies {
            if let Some(last) = summary.time_series.get(key).and_then(|s| s.last()) {
                samples.push(Sample::cluster(metric, last.value));
            }
        }

        for node in &self.nodes.nodes {
            if let Some(cpu) = node.node_cpu_utilization.as_ref().and_then(|m| m.last_val()) {
                samples.push(Sample::of(AlertMetricType::NodeCpu, &node.name, cpu));
            }

            if let Some(heap) = node.node_jvm_mem_percent.as_ref().and_then(|m| m.last_val()) {
                samples.push(Sample::of(AlertMetricType::NodeHeap, &node.name, heap));
            }
        }

        for index in self.indices.iter().flat_map(|i| &i.indices) {
            samples.push(Sample::of(
                AlertMetricType::IndexDocs,
                &index.name,
                index.doc_count as f64,
            ));
            samples.push(Sample::of(
                AlertMetricType::IndexSize,
                &index.name,
                index.data_size as f64,
            ));
        }

        samples
    }
}

/// Page through the node listing until every node Kibana reports is collected
async fn all_nodes<F, Fut>(mut fetch: F) -> anyhow::Result<NodesResponse>
where
    F: FnMut(Pagination) -> Fut,
    Fut: Future<Output = anyhow::Result<NodesResponse>>,
{
    let mut pagination = Pagination {
        index: 0,
        size: NODE_PAGE_SIZE,
    };
    let mut listing = fetch(pagination).await?;
    let mut last_page = listing.nodes.len();

    // A short page means Kibana has nothing more, whatever the reported total says
    while (listing.nodes.len() as i64) < listing.total_node_count
        && last_page == NODE_PAGE_SIZE as usize
    {
        pagination.index += 1;
        let page = fetch(pagination).await?;

        last_page = page.nodes.len();
        listing.nodes.extend(page.nodes);
    }

    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kibana::nodes::NodeInfo;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            overview: serde_json::from_value(json!({
                "clusterStatus": {
                    "status": "yellow",
                    "memUsed": 700,
                    "memMax": 1000,
                    "unassignedShards": 2
                },
                "metrics": {
                    "cluster_query_latency": [{"data": [[1, 3.0], [2, 7.5]]}]
                }
            }))
            .unwrap(),
            nodes: serde_json::from_value(json!({
                "nodes": [
                    {
                        "name": "es-node-01",
                        "node_cpu_utilization": {"summary": {"lastVal": 91.0}},
                        "node_jvm_mem_percent": {"summary": {"lastVal": 65.0}},
                        "node_free_space": {"summary": {"lastVal": 100.0}}
                    },
                    {"name": "es-node-02"}
                ]
            }))
            .unwrap(),
            indices: None,
        }
    }

    fn find(samples: &[Sample], metric: AlertMetricType, target: Option<&str>) -> Option<f64> {
        samples
            .iter()
            .find(|s| s.metric == metric && s.target.as_deref() == target)
            .map(|s| s.value)
    }

    #[test]
    fn derives_cluster_and_node_samples() {
        let samples = snapshot().samples("c1");

        assert_eq!(find(&samples, AlertMetricType::ClusterHealth, None), Some(1.0));
        assert_eq!(find(&samples, AlertMetricType::UnassignedShards, None), Some(2.0));
        assert_eq!(find(&samples, AlertMetricType::NodeMemory, None), Some(70.0));
        assert_eq!(find(&samples, AlertMetricType::NodeDisk, None), Some(60.0));
        assert_eq!(find(&samples, AlertMetricType::SearchLatency, None), Some(7.5));
        assert_eq!(find(&samples, AlertMetricType::IndexingLatency, None), None);
        assert_eq!(
            find(&samples, AlertMetricType::NodeCpu, Some("es-node-01")),
            Some(91.0)
        );
        assert_eq!(
            find(&samples, AlertMetricType::NodeHeap, Some("es-node-01")),
            Some(65.0)
        );
        assert_eq!(find(&samples, AlertMetricType::NodeCpu, Some("es-node-02")), None);
        assert!(samples.iter().all(|s| s.metric != AlertMetricType::GcTime));
    }

    #[test]
    fn index_samples_come_from_the_listing() {
        let mut snapshot = snapshot();
        snapshot.indices = Some(
            serde_json::from_value(json!({
                "indices": [{"name": "logs-1", "doc_count": 42, "data_size": 4096}]
            }))
            .unwrap(),
        );

        let samples = snapshot.samples("c1");

        assert_eq!(find(&samples, AlertMetricType::IndexDocs, Some("logs-1")), Some(42.0));
        assert_eq!(find(&samples, AlertMetricType::IndexSize, Some("logs-1")), Some(4096.0));
    }

    #[test]
    fn unknown_health_yields_no_health_sample() {
        let samples = Snapshot::default().samples("c1");

        assert_eq!(find(&samples, AlertMetricType::ClusterHealth, None), None);
    }

    fn cluster_nodes(count: usize) -> Vec<NodeInfo> {
        (0..count)
            .map(|i| NodeInfo {
                name: format!("es-node-{:03}", i),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn node_listing_is_paged_until_complete() {
        let cluster = cluster_nodes(250);
        let mut requested = Vec::new();

        let listing = all_nodes(|page: Pagination| {
            requested.push(page.index);

            let nodes: Vec<NodeInfo> = cluster
                .iter()
                .skip((page.index * page.size) as usize)
                .take(page.size as usize)
                .cloned()
                .collect();
            let total = cluster.len() as i64;

            async move {
                Ok(NodesResponse {
                    nodes,
                    total_node_count: total,
                    ..Default::default()
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(requested, vec![0, 1, 2]);
        assert_eq!(listing.nodes.len(), 250);
        assert_eq!(listing.nodes[249].name, "es-node-249");
    }

    #[tokio::test]
    async fn short_page_ends_the_listing() {
        let mut calls = 0;

        let listing = all_nodes(|_| {
            calls += 1;
            let nodes = cluster_nodes(30);

            async move {
                // Reported total is larger than what the cluster hands out
                Ok(NodesResponse {
                    nodes,
                    total_node_count: 40,
                    ..Default::default()
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(listing.nodes.len(), 30);
    }
}
