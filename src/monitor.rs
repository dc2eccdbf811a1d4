use crate::{
    kibana::{
        KibanaClient,
        cluster::{ClusterOverview, ClusterStatus},
        indices::{IndexDetail, IndicesResponse},
        nodes::{NodeDetail, NodesResponse},
    },
    monitor::{
        overview::MonitoringOverview,
        series::{SeriesMap, convert_metrics, index_metric_key, node_metric_key},
        time_range::{Pagination, TimeRange},
    },
};
use serde_json::json;
use std::sync::Arc;

pub mod overview;
pub mod series;
pub mod time_range;

/// Filters accepted by the index listing
#[derive(Debug, Clone, Default)]
pub struct IndicesQuery {
    pub pagination: Pagination,
    pub query_text: String,
    pub show_system_indices: bool,
}

#[derive(Clone)]
pub struct MonitorService {
    kibana: Arc<KibanaClient>,
}

impl MonitorService {
    pub fn new(kibana: Arc<KibanaClient>) -> Self {
        Self { kibana }
    }

    pub fn kibana(&self) -> &KibanaClient {
        &self.kibana
    }

    pub fn kibana_handle(&self) -> Arc<KibanaClient> {
        self.kibana.clone()
    }

    fn cluster_path(&self, suffix: &str) -> String {
        format!(
            "/api/monitoring/v1/clusters/{}/elasticsearch{}",
            self.kibana.cluster_id(),
            suffix
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn cluster_overview(&self, range: &TimeRange) -> anyhow::Result<ClusterOverview> {
        self.kibana
            .post(&self.cluster_path(""), &json!({ "timeRange": range }))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn nodes(
        &self,
        range: &TimeRange,
        pagination: Pagination,
    ) -> anyhow::Result<NodesResponse> {
        let body = json!({ "timeRange": range, "pagination": pagination });

        self.kibana.post(&self.cluster_path("/nodes"), &body).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn node_detail(&self, node_id: &str, range: &TimeRange) -> anyhow::Result<NodeDetail> {
        let body = json!({ "timeRange": range, "is_advanced": false });

        self.kibana
            .post(&self.cluster_path(&format!("/nodes/{}", node_id)), &body)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn indices(
        &self,
        range: &TimeRange,
        query: &IndicesQuery,
    ) -> anyhow::Result<IndicesResponse> {
        let path = self.cluster_path(&format!(
            "/indices?show_system_indices={}",
            query.show_system_indices
        ));
        let body = json!({
            "timeRange": range,
            "pagination": query.pagination,
            "queryText": query.query_text,
        });

        self.kibana.post(&path, &body).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn index_detail(
        &self,
        index_name: &str,
        range: &TimeRange,
    ) -> anyhow::Result<IndexDetail> {
        let body = json!({ "timeRange": range, "is_advanced": false });

        self.kibana
            .post(&self.cluster_path(&format!("/indices/{}", index_name)), &body)
            .await
    }

    /// Cluster status as reported alongside the node list for the last hour
    pub async fn cluster_status(&self) -> anyhow::Result<ClusterStatus> {
        let nodes = self
            .nodes(&TimeRange::default(), Pagination::default())
            .await?;

        Ok(nodes.cluster_status)
    }

    /// Fetch the cluster overview and the node list concurrently and summarise them
    #[tracing::instrument(skip(self))]
    pub async fn monitoring_overview(&self, range: &TimeRange) -> anyhow::Result<MonitoringOverview> {
        let (overview, nodes) = tokio::try_join!(
            self.cluster_overview(range),
            self.nodes(range, Pagination::default())
        )?;

        Ok(MonitoringOverview::build(
            self.kibana.cluster_id(),
            &overview,
            &nodes,
        ))
    }

    pub async fn node_timeseries(&self, node_id: &str, range: &TimeRange) -> anyhow::Result<SeriesMap> {
        let detail = self.node_detail(node_id, range).await?;

        Ok(convert_metrics(detail.metrics.as_ref(), node_metric_key))
    }

    pub async fn index_timeseries(
        &self,
        index_name: &str,
        range: &TimeRange,
    ) -> anyhow::Result<SeriesMap> {
        let detail = self.index_detail(index_name, range).await?;

        Ok(convert_metrics(detail.metrics.as_ref(), index_metric_key))
    }
}
