use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricInfo {
    pub app: Option<String>,
    pub field: Option<String>,
    pub metric_agg: Option<String>,
    pub label: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub units: Option<String>,
    pub format: Option<String>,
    pub has_calculation: Option<bool>,
    pub is_derivative: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricSummary {
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
    pub last_val: Option<f64>,
    /// 1 rising, -1 falling, 0 flat
    pub slope: Option<i32>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SeriesTimeRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// One chart series as Kibana returns it; `data` is `[[timestamp, value|null], ...]`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TimeSeriesData {
    pub bucket_size: Option<String>,
    #[serde(rename = "timeRange")]
    pub time_range: Option<SeriesTimeRange>,
    pub metric: Option<MetricInfo>,
    pub data: Option<Vec<Vec<Value>>>,
}

/// Chart-friendly data point
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub timestamp: i64,
    pub value: f64,
}
