use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

static NODE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/nodes/[a-zA-Z0-9_-]+").expect("valid node regex"));
static INDEX_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/indices/[^/?]+").expect("valid index regex"));

/// Collapse dynamic path segments so calls to different nodes or indices share one entry
pub fn simplify_path(path: &str) -> String {
    let simplified = NODE_SEGMENT.replace_all(path, "/nodes/{nodeId}");
    let simplified = INDEX_SEGMENT.replace_all(&simplified, "/indices/{indexName}");

    match simplified.find('?') {
        Some(idx) if idx > 0 => simplified[..idx].to_string(),
        _ => simplified.into_owned(),
    }
}

#[derive(Debug, Clone)]
struct ApiStats {
    call_count: u64,
    total_time_ms: u64,
    min_time_ms: u64,
    max_time_ms: u64,
    last_call_time_ms: u64,
}

impl Default for ApiStats {
    fn default() -> Self {
        Self {
            call_count: 0,
            total_time_ms: 0,
            min_time_ms: u64::MAX,
            max_time_ms: 0,
            last_call_time_ms: 0,
        }
    }
}

impl ApiStats {
    fn record(&mut self, time_ms: u64) {
        self.call_count += 1;
        self.total_time_ms += time_ms;
        self.last_call_time_ms = time_ms;
        self.min_time_ms = self.min_time_ms.min(time_ms);
        self.max_time_ms = self.max_time_ms.max(time_ms);
    }
}

/// Point-in-time view of the calls made to one upstream path
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatsSnapshot {
    pub call_count: u64,
    pub avg_time_ms: u64,
    pub min_time_ms: u64,
    pub max_time_ms: u64,
    pub last_call_time_ms: u64,
    pub total_time_ms: u64,
}

impl From<&ApiStats> for ApiStatsSnapshot {
    fn from(stats: &ApiStats) -> Self {
        let avg_time_ms = match stats.call_count {
            0 => 0,
            count => stats.total_time_ms / count,
        };
        let min_time_ms = match stats.min_time_ms {
            u64::MAX => 0,
            min => min,
        };

        Self {
            call_count: stats.call_count,
            avg_time_ms,
            min_time_ms,
            max_time_ms: stats.max_time_ms,
            last_call_time_ms: stats.last_call_time_ms,
            total_time_ms: stats.total_time_ms,
        }
    }
}

/// Call latency table for the upstream Kibana API, keyed by simplified path
pub struct ApiStatsTable {
    entries: Mutex<HashMap<String, ApiStats>>,
    slow_call_threshold_ms: u64,
}

impl ApiStatsTable {
    pub fn new(slow_call_threshold_ms: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            slow_call_threshold_ms,
        }
    }

    pub fn record(&self, path: &str, time_ms: u64) {
        self.entries
            .lock()
            .entry(path.to_string())
            .or_default()
            .record(time_ms);

        if time_ms > self.slow_call_threshold_ms {
            tracing::warn!("Slow API call: {} took {}ms", path, time_ms);
        }
    }

    pub fn snapshot(&self) -> HashMap<String, ApiStatsSnapshot> {
        self.entries
            .lock()
            .iter()
            .map(|(path, stats)| (path.clone(), ApiStatsSnapshot::from(stats)))
            .collect()
    }

    /// Human-readable report, slowest average first
    pub fn report(&self) -> String {
        let mut rows: Vec<_> = self.snapshot().into_iter().collect();
        rows.sort_by(|a, b| b.1.avg_time_ms.cmp(&a.1.avg_time_ms));

        let mut report = String::from("\n========== Kibana API Statistics ==========\n");
        for (path, stats) in rows {
            report.push_str(&format!(
                "API[{}]: calls={}, avg={}ms, min={}ms, max={}ms, last={}ms\n",
                path,
                stats.call_count,
                stats.avg_time_ms,
                stats.min_time_ms,
                stats.max_time_ms,
                stats.last_call_time_ms
            ));
        }
        report.push_str("============================================\n");

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplifies_node_and_index_segments() {
        assert_eq!(
            simplify_path("/api/monitoring/v1/clusters/abc/elasticsearch/nodes/Xy_9-z"),
            "/api/monitoring/v1/clusters/abc/elasticsearch/nodes/{nodeId}"
        );
        assert_eq!(
            simplify_path("/api/monitoring/v1/clusters/abc/elasticsearch/indices/logs-2024.01"),
            "/api/monitoring/v1/clusters/abc/elasticsearch/indices/{indexName}"
        );
    }

    #[test]
    fn drops_query_string() {
        assert_eq!(
            simplify_path(
                "/api/monitoring/v1/clusters/abc/elasticsearch/indices?show_system_indices=false"
            ),
            "/api/monitoring/v1/clusters/abc/elasticsearch/indices"
        );
    }

    #[test]
    fn aggregates_calls_per_path() {
        let table = ApiStatsTable::new(2000);
        table.record("/a", 10);
        table.record("/a", 30);
        table.record("/b", 5);

        let snapshot = table.snapshot();
        let a = &snapshot["/a"];

        assert_eq!(a.call_count, 2);
        assert_eq!(a.avg_time_ms, 20);
        assert_eq!(a.min_time_ms, 10);
        assert_eq!(a.max_time_ms, 30);
        assert_eq!(a.last_call_time_ms, 30);
        assert_eq!(a.total_time_ms, 40);
        assert_eq!(snapshot["/b"].call_count, 1);
    }

    #[test]
    fn report_lists_slowest_first() {
        let table = ApiStatsTable::new(2000);
        table.record("/fast", 1);
        table.record("/slow", 900);

        let report = table.report();
        let slow = report.find("API[/slow]").unwrap();
        let fast = report.find("API[/fast]").unwrap();

        assert!(slow < fast);
    }
}
