use crate::kibana::timeseries::{TimeSeriesData, TimeSeriesPoint};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub type SeriesMap = BTreeMap<String, Vec<TimeSeriesPoint>>;

/// Keep only `[timestamp, value, ..]` points where both leading entries are numbers
pub fn convert_time_series(series: &TimeSeriesData) -> Vec<TimeSeriesPoint> {
    let Some(data) = series.data.as_ref() else {
        return Vec::new();
    };

    data.iter()
        .filter(|point| point.len() >= 2)
        .filter_map(|point| {
            let timestamp = as_timestamp(&point[0])?;
            let value = point[1].as_f64()?;

            Some(TimeSeriesPoint { timestamp, value })
        })
        .collect()
}

fn as_timestamp(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// First series of a metric, if Kibana returned any
pub fn first_series(series: Option<&Vec<TimeSeriesData>>) -> Option<&TimeSeriesData> {
    series.and_then(|s| s.first())
}

/// Convert every metric's first series, renaming keys with `rename`
pub fn convert_metrics(
    metrics: Option<&HashMap<String, Vec<TimeSeriesData>>>,
    rename: fn(&str) -> &str,
) -> SeriesMap {
    let Some(metrics) = metrics else {
        return SeriesMap::new();
    };

    metrics
        .iter()
        .filter_map(|(name, series)| {
            let first = series.first()?;
            Some((rename(name).to_string(), convert_time_series(first)))
        })
        .collect()
}

pub fn node_metric_key(kibana_key: &str) -> &str {
    match kibana_key {
        "node_cpu_utilization" | "node_cpu_metric" => "cpu_percent",
        "node_jvm_mem" => "heap_used_percent",
        "node_load_average" => "load_average",
        "node_latency" => "latency",
        "node_index_mem" => "index_memory",
        "node_total_io" => "io_operations",
        "node_segment_count" => "segment_count",
        other => other,
    }
}

pub fn index_metric_key(kibana_key: &str) -> &str {
    match kibana_key {
        "index_search_request_rate" => "search_rate",
        "index_request_rate" => "indexing_rate",
        "index_latency" => "query_latency",
        "index_document_count" => "doc_count",
        "index_segment_count" => "segment_count",
        "index_mem" => "index_memory",
        other => other,
    }
}
