use crate::{
    error::ApiResult,
    format::format_duration,
    kibana::{
        cluster::{ClusterOverview, ClusterStatus},
        indices::{IndexDetail, IndicesResponse},
        nodes::{NodeDetail, NodesResponse},
        stats::ApiStatsSnapshot,
    },
    metrics::http::{http_request_timer, record_http_request},
    monitor::{
        IndicesQuery,
        overview::MonitoringOverview,
        series::SeriesMap,
        time_range::{Pagination, TimeRange},
    },
    now_millis,
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_MINUTES: i64 = 60;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorQuery {
    minutes: Option<i64>,
    page: Option<u32>,
    page_size: Option<u32>,
    query_text: Option<String>,
    show_system_indices: Option<bool>,
}

impl MonitorQuery {
    fn range(&self) -> TimeRange {
        TimeRange::last_minutes(self.minutes.filter(|m| *m > 0).unwrap_or(DEFAULT_MINUTES))
    }

    fn pagination(&self) -> Pagination {
        let default = Pagination::default();

        Pagination {
            index: self.page.unwrap_or(default.index),
            size: self.page_size.filter(|s| *s > 0).unwrap_or(default.size),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    api_stats: HashMap<String, ApiStatsSnapshot>,
    timestamp: i64,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/monitor/cluster/overview", get(cluster_overview))
        .route("/api/monitor/overview", get(overview))
        .route("/api/monitor/cluster/status", get(cluster_status))
        .route("/api/monitor/nodes", get(nodes))
        .route("/api/monitor/nodes/{id}", get(node_detail))
        .route("/api/monitor/nodes/{id}/timeseries", get(node_timeseries))
        .route("/api/monitor/indices", get(indices))
        .route("/api/monitor/indices/{name}", get(index_detail))
        .route("/api/monitor/indices/{name}/timeseries", get(index_timeseries))
        .route("/api/monitor/stats", get(stats))
}

async fn cluster_overview(
    State(state): State<AppState>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<ClusterOverview>> {
    record_http_request("/api/monitor/cluster/overview");
    let _timer = http_request_timer("/api/monitor/cluster/overview");

    Ok(Json(state.monitor.cluster_overview(&query.range()).await?))
}

async fn overview(
    State(state): State<AppState>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<MonitoringOverview>> {
    record_http_request("/api/monitor/overview");
    let _timer = http_request_timer("/api/monitor/overview");

    Ok(Json(state.monitor.monitoring_overview(&query.range()).await?))
}

async fn cluster_status(State(state): State<AppState>) -> ApiResult<Json<ClusterStatus>> {
    record_http_request("/api/monitor/cluster/status");
    let _timer = http_request_timer("/api/monitor/cluster/status");

    Ok(Json(state.monitor.cluster_status().await?))
}

async fn nodes(
    State(state): State<AppState>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<NodesResponse>> {
    record_http_request("/api/monitor/nodes");
    let _timer = http_request_timer("/api/monitor/nodes");

    Ok(Json(
        state
            .monitor
            .nodes(&query.range(), query.pagination())
            .await?,
    ))
}

async fn node_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<NodeDetail>> {
    record_http_request("/api/monitor/nodes/{id}");
    let _timer = http_request_timer("/api/monitor/nodes/{id}");

    Ok(Json(state.monitor.node_detail(&id, &query.range()).await?))
}

async fn node_timeseries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<SeriesMap>> {
    record_http_request("/api/monitor/nodes/{id}/timeseries");
    let _timer = http_request_timer("/api/monitor/nodes/{id}/timeseries");

    Ok(Json(state.monitor.node_timeseries(&id, &query.range()).await?))
}

async fn indices(
    State(state): State<AppState>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<IndicesResponse>> {
    record_http_request("/api/monitor/indices");
    let _timer = http_request_timer("/api/monitor/indices");

    let indices_query = IndicesQuery {
        pagination: query.pagination(),
        query_text: query.query_text.clone().unwrap_or_default(),
        show_system_indices: query.show_system_indices.unwrap_or(false),
    };

    Ok(Json(
        state
            .monitor
            .indices(&query.range(), &indices_query)
            .await?,
    ))
}

async fn index_detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<IndexDetail>> {
    record_http_request("/api/monitor/indices/{name}");
    let _timer = http_request_timer("/api/monitor/indices/{name}");

    Ok(Json(state.monitor.index_detail(&name, &query.range()).await?))
}

async fn index_timeseries(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<SeriesMap>> {
    record_http_request("/api/monitor/indices/{name}/timeseries");
    let _timer = http_request_timer("/api/monitor/indices/{name}/timeseries");

    Ok(Json(
        state
            .monitor
            .index_timeseries(&name, &query.range())
            .await?,
    ))
}

/// Per-path latency of the upstream Kibana calls made so far
async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    record_http_request("/api/monitor/stats");
    let _timer = http_request_timer("/api/monitor/stats");

    let table = state.monitor.kibana().stats();
    let api_stats = table.snapshot();

    tracing::info!("{}", table.report());
    if let Some(slowest) = api_stats.values().map(|s| s.max_time_ms).max() {
        tracing::debug!("Slowest Kibana call so far took {}", format_duration(slowest));
    }

    Json(StatsResponse {
        api_stats,
        timestamp: now_millis(),
    })
}
