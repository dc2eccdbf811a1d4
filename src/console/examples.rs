use crate::{console::ConsoleTemplate, kibana::HttpMethod};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize)]
pub struct ExampleCategory {
    pub key: String,
    pub label: String,
    pub examples: Vec<ConsoleTemplate>,
}

fn example(label: &str, description: &str, method: HttpMethod, path: &str, body: Option<Value>) -> ConsoleTemplate {
    let body = body
        .and_then(|b| serde_json::to_string_pretty(&b).ok())
        .unwrap_or_default();

    ConsoleTemplate {
        id: None,
        label: label.to_string(),
        description: Some(description.to_string()),
        method,
        path: path.to_string(),
        body,
        is_custom: false,
    }
}

fn category(key: &str, label: &str, examples: Vec<ConsoleTemplate>) -> ExampleCategory {
    ExampleCategory {
        key: key.to_string(),
        label: label.to_string(),
        examples,
    }
}

/// Ready-made requests grouped by area
pub fn builtin() -> Vec<ExampleCategory> {
    use HttpMethod::{Delete, Get, Post, Put};

    let mut bulk = example("Bulk", "Index several documents at once", Post, "/_bulk", None);
    bulk.body = concat!(
        "{\"index\":{\"_index\":\"my-index\",\"_id\":\"1\"}}\n",
        "{\"title\":\"Document 1\"}\n",
        "{\"index\":{\"_index\":\"my-index\",\"_id\":\"2\"}}\n",
        "{\"title\":\"Document 2\"}\n"
    )
    .to_string();

    vec![
        category("cluster", "Cluster", vec![
            example("Cluster health", "Overall cluster health", Get, "/_cluster/health", None),
            example("Cluster stats", "Detailed cluster statistics", Get, "/_cluster/stats", None),
            example(
                "Cluster settings",
                "Cluster configuration including defaults",
                Get,
                "/_cluster/settings?include_defaults=true",
                None,
            ),
            example("Pending tasks", "Cluster-level changes not yet executed", Get, "/_cluster/pending_tasks", None),
            example(
                "Allocation explain",
                "Why a shard is or is not allocated",
                Get,
                "/_cluster/allocation/explain",
                Some(json!({ "index": "my-index", "shard": 0, "primary": true })),
            ),
            example(
                "Update cluster settings",
                "Change a persistent cluster setting",
                Put,
                "/_cluster/settings",
                Some(json!({ "persistent": { "cluster.routing.allocation.enable": "all" } })),
            ),
        ]),
        category("node", "Nodes", vec![
            example("Node info", "Information about every node", Get, "/_nodes", None),
            example("Node stats", "Detailed node statistics", Get, "/_nodes/stats", None),
            example("Hot threads", "Busiest threads per node", Get, "/_nodes/hot_threads", None),
            example("Node usage", "Feature usage per node", Get, "/_nodes/usage", None),
        ]),
        category("index", "Indices", vec![
            example("List indices", "Every index, sorted by name", Get, "/_cat/indices?v&s=index", None),
            example(
                "Create index",
                "Create an index with settings and mappings",
                Put,
                "/my-new-index",
                Some(json!({
                    "settings": { "number_of_shards": 3, "number_of_replicas": 1 },
                    "mappings": {
                        "properties": {
                            "title": { "type": "text" },
                            "created_at": { "type": "date" },
                            "status": { "type": "keyword" }
                        }
                    }
                })),
            ),
            example("Delete index", "Delete an index", Delete, "/my-index", None),
            example("Index settings", "Show index settings", Get, "/my-index/_settings", None),
            example("Index mapping", "Show index mapping", Get, "/my-index/_mapping", None),
            example(
                "Update mapping",
                "Add a field to the mapping",
                Put,
                "/my-index/_mapping",
                Some(json!({ "properties": { "new_field": { "type": "keyword" } } })),
            ),
            example("Refresh", "Make recent writes searchable", Post, "/my-index/_refresh", None),
            example(
                "Force merge",
                "Merge segments down to one",
                Post,
                "/my-index/_forcemerge?max_num_segments=1",
                None,
            ),
        ]),
        category("alias", "Aliases", vec![
            example("List aliases", "Every alias", Get, "/_cat/aliases?v", None),
            example(
                "Add alias",
                "Point an alias at an index",
                Post,
                "/_aliases",
                Some(json!({ "actions": [{ "add": { "index": "my-index", "alias": "my-alias" } }] })),
            ),
            example(
                "Remove alias",
                "Remove an alias from an index",
                Post,
                "/_aliases",
                Some(json!({ "actions": [{ "remove": { "index": "my-index", "alias": "my-alias" } }] })),
            ),
            example(
                "Switch alias",
                "Atomically move an alias to a new index",
                Post,
                "/_aliases",
                Some(json!({
                    "actions": [
                        { "remove": { "index": "old-index", "alias": "my-alias" } },
                        { "add": { "index": "new-index", "alias": "my-alias" } }
                    ]
                })),
            ),
        ]),
        category("search", "Search", vec![
            example(
                "Match all",
                "Every document",
                Post,
                "/my-index/_search",
                Some(json!({ "query": { "match_all": {} }, "size": 10 })),
            ),
            example(
                "Match",
                "Full text match",
                Post,
                "/my-index/_search",
                Some(json!({ "query": { "match": { "title": "search terms" } } })),
            ),
            example(
                "Multi match",
                "Match across several fields",
                Post,
                "/my-index/_search",
                Some(json!({
                    "query": {
                        "multi_match": { "query": "search terms", "fields": ["title^2", "content", "tags"] }
                    }
                })),
            ),
            example(
                "Term",
                "Exact value match",
                Post,
                "/my-index/_search",
                Some(json!({ "query": { "term": { "status": { "value": "published" } } } })),
            ),
            example(
                "Range",
                "Range condition",
                Post,
                "/my-index/_search",
                Some(json!({
                    "query": { "range": { "created_at": { "gte": "2024-01-01", "lte": "2024-12-31" } } }
                })),
            ),
            example(
                "Bool",
                "Combine clauses",
                Post,
                "/my-index/_search",
                Some(json!({
                    "query": {
                        "bool": {
                            "must": [{ "match": { "title": "keyword" } }],
                            "filter": [{ "term": { "status": "published" } }],
                            "must_not": [{ "term": { "deleted": true } }]
                        }
                    }
                })),
            ),
            example(
                "Highlight",
                "Highlight matches in results",
                Post,
                "/my-index/_search",
                Some(json!({
                    "query": { "match": { "content": "keyword" } },
                    "highlight": { "fields": { "content": {} } }
                })),
            ),
            example(
                "Sort and paginate",
                "Sorted results with paging",
                Post,
                "/my-index/_search",
                Some(json!({
                    "query": { "match_all": {} },
                    "sort": [{ "created_at": "desc" }],
                    "from": 0,
                    "size": 20
                })),
            ),
        ]),
        category("aggregation", "Aggregations", vec![
            example(
                "Terms",
                "Group by field value",
                Post,
                "/my-index/_search",
                Some(json!({ "size": 0, "aggs": { "status_count": { "terms": { "field": "status", "size": 10 } } } })),
            ),
            example(
                "Stats",
                "Numeric field statistics",
                Post,
                "/my-index/_search",
                Some(json!({ "size": 0, "aggs": { "price_stats": { "stats": { "field": "price" } } } })),
            ),
            example(
                "Date histogram",
                "Bucket documents by day",
                Post,
                "/my-index/_search",
                Some(json!({
                    "size": 0,
                    "aggs": {
                        "daily_count": { "date_histogram": { "field": "created_at", "calendar_interval": "day" } }
                    }
                })),
            ),
            example(
                "Nested aggregation",
                "Average price per category",
                Post,
                "/my-index/_search",
                Some(json!({
                    "size": 0,
                    "aggs": {
                        "by_category": {
                            "terms": { "field": "category" },
                            "aggs": { "avg_price": { "avg": { "field": "price" } } }
                        }
                    }
                })),
            ),
            example(
                "Cardinality",
                "Count distinct values",
                Post,
                "/my-index/_search",
                Some(json!({ "size": 0, "aggs": { "unique_users": { "cardinality": { "field": "user_id" } } } })),
            ),
            example(
                "Percentiles",
                "Response time percentiles",
                Post,
                "/my-index/_search",
                Some(json!({
                    "size": 0,
                    "aggs": {
                        "response_percentiles": {
                            "percentiles": { "field": "response_time", "percents": [50, 90, 95, 99] }
                        }
                    }
                })),
            ),
        ]),
        category("pipeline", "Ingest pipelines", vec![
            example("List pipelines", "Every ingest pipeline", Get, "/_ingest/pipeline", None),
            example(
                "Create pipeline",
                "Stamp and lowercase incoming documents",
                Put,
                "/_ingest/pipeline/my-pipeline",
                Some(json!({
                    "description": "Document processing",
                    "processors": [
                        { "set": { "field": "processed_at", "value": "{{_ingest.timestamp}}" } },
                        { "lowercase": { "field": "message" } }
                    ]
                })),
            ),
            example(
                "Grok pipeline",
                "Parse access log lines",
                Put,
                "/_ingest/pipeline/grok-pipeline",
                Some(json!({
                    "description": "Access log parsing",
                    "processors": [{
                        "grok": {
                            "field": "message",
                            "patterns": ["%{IP:client_ip} %{WORD:method} %{URIPATHPARAM:request}"]
                        }
                    }]
                })),
            ),
            example(
                "Simulate pipeline",
                "Try a pipeline on a sample document",
                Post,
                "/_ingest/pipeline/my-pipeline/_simulate",
                Some(json!({ "docs": [{ "_source": { "message": "TEST MESSAGE" } }] })),
            ),
            example("Delete pipeline", "Delete a pipeline", Delete, "/_ingest/pipeline/my-pipeline", None),
        ]),
        category("template", "Index templates", vec![
            example("List templates", "Every index template", Get, "/_index_template", None),
            example(
                "Create template",
                "Template for logs-* indices",
                Put,
                "/_index_template/logs-template",
                Some(json!({
                    "index_patterns": ["logs-*"],
                    "priority": 100,
                    "template": {
                        "settings": { "number_of_shards": 3 },
                        "mappings": {
                            "properties": {
                                "@timestamp": { "type": "date" },
                                "message": { "type": "text" }
                            }
                        }
                    }
                })),
            ),
            example("Delete template", "Delete an index template", Delete, "/_index_template/my-template", None),
        ]),
        category("document", "Documents", vec![
            example("Get document", "Fetch a document by id", Get, "/my-index/_doc/1", None),
            example(
                "Index document",
                "Create a document with an explicit id",
                Put,
                "/my-index/_doc/1",
                Some(json!({
                    "title": "Title",
                    "content": "Content",
                    "created_at": "2024-01-15T10:30:00Z"
                })),
            ),
            example(
                "Update document",
                "Partial update",
                Post,
                "/my-index/_update/1",
                Some(json!({ "doc": { "status": "updated" } })),
            ),
            example("Delete document", "Delete a document by id", Delete, "/my-index/_doc/1", None),
            bulk,
            example(
                "Delete by query",
                "Delete documents older than 30 days",
                Post,
                "/my-index/_delete_by_query",
                Some(json!({ "query": { "range": { "created_at": { "lt": "now-30d" } } } })),
            ),
        ]),
        category("reindex", "Reindex", vec![
            example(
                "Reindex",
                "Copy an index into a new one",
                Post,
                "/_reindex",
                Some(json!({ "source": { "index": "old-index" }, "dest": { "index": "new-index" } })),
            ),
            example(
                "Reindex with query",
                "Copy only matching documents",
                Post,
                "/_reindex",
                Some(json!({
                    "source": {
                        "index": "old-index",
                        "query": { "range": { "created_at": { "gte": "2024-01-01" } } }
                    },
                    "dest": { "index": "new-index" }
                })),
            ),
            example(
                "Async reindex",
                "Run the reindex as a background task",
                Post,
                "/_reindex?wait_for_completion=false",
                Some(json!({ "source": { "index": "old-index" }, "dest": { "index": "new-index" } })),
            ),
        ]),
        category("task", "Tasks", vec![
            example("List tasks", "Running tasks", Get, "/_tasks", None),
            example("Detailed tasks", "Running tasks with details", Get, "/_tasks?detailed=true", None),
            example("Cancel task", "Cancel a running task", Post, "/_tasks/node_id:task_id/_cancel", None),
        ]),
        category("script", "Scripts", vec![
            example(
                "Store script",
                "Save a reusable script",
                Put,
                "/_scripts/calculate-score",
                Some(json!({
                    "script": { "lang": "painless", "source": "doc['likes'].value * 2 + doc['views'].value" }
                })),
            ),
            example(
                "Script score",
                "Score documents with a script",
                Post,
                "/my-index/_search",
                Some(json!({
                    "query": {
                        "script_score": {
                            "query": { "match_all": {} },
                            "script": { "source": "_score * doc['boost'].value" }
                        }
                    }
                })),
            ),
        ]),
        category("analyzer", "Analyzers", vec![
            example(
                "Standard analyzer",
                "Tokenize text with the standard analyzer",
                Post,
                "/_analyze",
                Some(json!({ "analyzer": "standard", "text": "Hello World" })),
            ),
            example(
                "Whitespace analyzer",
                "Split text on whitespace only",
                Post,
                "/_analyze",
                Some(json!({ "analyzer": "whitespace", "text": "Quick brown-fox" })),
            ),
        ]),
        category("cat", "CAT API", vec![
            example("Indices", "Every index", Get, "/_cat/indices?v&s=index", None),
            example("Nodes", "Every node", Get, "/_cat/nodes?v", None),
            example("Shards", "Shard placement", Get, "/_cat/shards?v", None),
            example("Aliases", "Every alias", Get, "/_cat/aliases?v", None),
            example("Thread pools", "Thread pool usage", Get, "/_cat/thread_pool?v", None),
            example("Health", "Cluster health", Get, "/_cat/health?v", None),
        ]),
    ]
}
