use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::{Request, StatusCode},
    routing::post,
};
use es_manage::{
    alerting::notify::Notifier, config::Config, http::create_router, kibana::KibanaClient,
    monitor::MonitorService, state::AppState,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tower::ServiceExt;

fn cluster_status() -> Value {
    json!({
        "status": "yellow",
        "indicesCount": 12,
        "documentCount": 1000,
        "dataSize": 4096,
        "nodesCount": 2,
        "upTime": 3_600_000,
        "version": ["8.11.0"],
        "memUsed": 512,
        "memMax": 1024,
        "unassignedShards": 1,
        "totalShards": 24
    })
}

async fn proxy(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let path = params.get("path").map(String::as_str).unwrap_or_default();

    match path {
        "/_cluster/health" => (
            StatusCode::OK,
            Json(json!({ "cluster_name": "es-test", "status": "yellow" })),
        ),
        p if p.starts_with("/missing") => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "type": "index_not_found_exception" }, "status": 404 })),
        ),
        _ => (StatusCode::OK, Json(json!({ "acknowledged": true }))),
    }
}

/// Serve the handful of Kibana endpoints the backend talks to
async fn fake_kibana() -> String {
    let app = Router::new()
        .route(
            "/api/monitoring/v1/clusters/{cluster}/elasticsearch",
            post(|| async { Json(json!({ "clusterStatus": cluster_status(), "shardActivity": [] })) }),
        )
        .route(
            "/api/monitoring/v1/clusters/{cluster}/elasticsearch/nodes",
            post(|| async {
                Json(json!({
                    "clusterStatus": cluster_status(),
                    "nodes": [
                        { "name": "es-node-01", "uuid": "n1", "isOnline": true, "roles": ["master", "data"] },
                        { "name": "es-node-02", "uuid": "n2", "isOnline": true, "roles": ["data"] }
                    ],
                    "totalNodeCount": 2
                }))
            }),
        )
        .route("/api/console/proxy", post(proxy));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn app() -> Router {
    let base_url = fake_kibana().await;
    let config = Config::from_yaml(&format!(
        r#"
kibana:
  baseUrl: {}
  clusterId: test-cluster
  username: elastic
  password: changeme
  version: 8.11.0
  buildNumber: "68000"
  readTimeout: 5
http:
  host: 127.0.0.1
  port: 0
"#,
        base_url
    ))
    .unwrap();

    let kibana = Arc::new(KibanaClient::new(config.kibana).unwrap());
    let state = AppState::new(
        MonitorService::new(kibana),
        Arc::new(Notifier::new().unwrap()),
        0,
    );

    create_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let value = match bytes.is_empty() {
        true => Value::Null,
        false => serde_json::from_slice(&bytes).unwrap(),
    };

    (status, value)
}

async fn poll_status(app: &Router, uri: &str, busy: &str) -> Value {
    for _ in 0..200 {
        let (_, body) = send(app, "GET", uri, None).await;
        if body["status"] != busy {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("{} stayed {}", uri, busy);
}

#[tokio::test]
async fn alive() {
    let app = app().await;

    let (status, _) = send(&app, "GET", "/alive", None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn monitoring_overview_combines_cluster_and_nodes() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/monitor/overview?minutes=30", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cluster"]["uuid"], "test-cluster");
    assert_eq!(body["cluster"]["status"], "yellow");
    assert_eq!(body["cluster"]["version"], "8.11.0");
    assert_eq!(body["nodes"]["total"], 2);
    assert_eq!(body["nodes"]["data"], 2);
    assert_eq!(body["nodes"]["master"], 1);
    assert_eq!(body["indices"]["docs"], 1000);
    assert_eq!(body["shards"]["unassigned"], 1);

    let (status, body) = send(&app, "GET", "/api/monitor/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["apiStats"].as_object().unwrap().len() >= 2);
}

#[tokio::test]
async fn kibana_failures_are_bad_gateway() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/monitor/nodes/n1", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 502);
    assert!(body["message"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn console_executes_and_keeps_history() {
    let app = app().await;

    let (status, entry) = send(
        &app,
        "POST",
        "/api/console/execute",
        Some(json!({ "method": "get", "path": "_cluster/health" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["method"], "GET");
    assert_eq!(entry["path"], "/_cluster/health");
    assert_eq!(entry["status"], 200);
    assert_eq!(entry["response"]["cluster_name"], "es-test");

    // Elasticsearch errors are relayed, not raised
    let (status, entry) = send(
        &app,
        "POST",
        "/api/console/execute",
        Some(json!({ "method": "GET", "path": "/missing-index/_search" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["status"], 404);

    let (status, _) = send(
        &app,
        "POST",
        "/api/console/execute",
        Some(json!({ "method": "PATCH", "path": "/" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, history) = send(&app, "GET", "/api/console/history", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["path"], "/missing-index/_search");

    let (status, _) = send(&app, "DELETE", "/api/console/history", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, history) = send(&app, "GET", "/api/console/history", None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn console_custom_templates_lead_the_categories() {
    let app = app().await;

    let (_, categories) = send(&app, "GET", "/api/console/categories", None).await;
    assert_eq!(categories[0]["key"], "cluster");

    let (status, template) = send(
        &app,
        "POST",
        "/api/console/templates",
        Some(json!({ "label": "Hot threads", "method": "GET", "path": "/_nodes/hot_threads" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(template["id"].as_str().unwrap().starts_with("custom-"));
    assert_eq!(template["isCustom"], true);

    let (_, categories) = send(&app, "GET", "/api/console/categories", None).await;
    assert_eq!(categories[0]["key"], "custom");
    assert_eq!(categories[0]["examples"][0]["label"], "Hot threads");
}

#[tokio::test]
async fn alert_rules_crud_and_error_body() {
    let app = app().await;

    let (status, rule) = send(
        &app,
        "POST",
        "/api/alerts/rules",
        Some(json!({
            "name": "Heap pressure",
            "metric": "node_heap",
            "operator": "gt",
            "threshold": 85,
            "duration": 180,
            "severity": "critical",
            "cooldown": 300
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rule["enabled"], true);

    let id = rule["id"].as_str().unwrap();
    let (status, toggled) = send(&app, "POST", &format!("/api/alerts/rules/{}/toggle", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["enabled"], false);

    let (status, body) = send(&app, "GET", "/api/alerts/rules/rule-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "Rule 'rule-missing' not found");
    assert!(body["timestamp"].is_i64());

    let (status, body) = send(
        &app,
        "POST",
        "/api/alerts/rules",
        Some(json!({
            "name": "Orphan",
            "metric": "node_cpu",
            "operator": "gt",
            "threshold": 90,
            "severity": "warning",
            "notificationChannels": ["nowhere"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown notification channel 'nowhere'");

    let (status, _) = send(&app, "DELETE", &format!("/api/alerts/rules/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, rules) = send(&app, "GET", "/api/alerts/rules", None).await;
    assert!(rules.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn approved_request_runs_its_bound_workflow() {
    let app = app().await;

    let (status, request) = send(
        &app,
        "POST",
        "/api/approvals",
        Some(json!({
            "title": "Switch logs alias",
            "type": "update_alias",
            "applicant": "alice",
            "content": { "alias": "logs", "oldIndex": "logs-01", "newIndex": "logs-02" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");

    let id = request["id"].as_str().unwrap().to_string();

    let (_, request) = send(&app, "POST", &format!("/api/approvals/{}/approve", id), None).await;
    assert_eq!(request["status"], "pending");
    assert_eq!(request["nodes"][0]["operatedBy"], "admin");

    let (status, request) = send(
        &app,
        "POST",
        &format!("/api/approvals/{}/approve", id),
        Some(json!({ "operator": "dba", "comment": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "processing");

    let workflow_id = request["workflowId"].as_str().unwrap().to_string();
    let instance = poll_status(
        &app,
        &format!("/api/workflows/instances/{}", workflow_id),
        "running",
    )
    .await;
    assert_eq!(instance["status"], "completed");
    assert_eq!(instance["templateId"], "tpl-003");
    assert_eq!(instance["triggerType"], "approval");

    let request = poll_status(&app, &format!("/api/approvals/{}", id), "processing").await;
    assert_eq!(request["status"], "completed");

    let (_, statistics) = send(&app, "GET", "/api/approvals/statistics", None).await;
    assert_eq!(statistics["total"], 1);
    assert_eq!(statistics["byStatus"]["completed"], 1);

    let (_, executions) = send(&app, "GET", "/api/workflows/executions", None).await;
    assert_eq!(executions.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejecting_requires_a_reason() {
    let app = app().await;

    let (_, request) = send(
        &app,
        "POST",
        "/api/approvals",
        Some(json!({ "title": "Drop old logs", "type": "delete_index", "applicant": "bob" })),
    )
    .await;
    let id = request["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/approvals/{}/reject", id),
        Some(json!({ "operator": "lead" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, request) = send(
        &app,
        "POST",
        &format!("/api/approvals/{}/reject", id),
        Some(json!({ "operator": "lead", "comment": "still in use" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "rejected");

    let (status, body) = send(&app, "POST", &format!("/api/approvals/{}/execute", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn template_bindings() {
    let app = app().await;

    let (_, templates) = send(&app, "GET", "/api/workflows/templates", None).await;
    assert_eq!(templates.as_array().unwrap().len(), 5);

    let (_, bound) = send(&app, "GET", "/api/workflows/bindings/create_index", None).await;
    assert_eq!(bound[0]["id"], "tpl-002");

    let (status, template) = send(
        &app,
        "PUT",
        "/api/workflows/templates/tpl-005/bindings",
        Some(json!({ "approvalTypes": ["delete_alias", "delete_index", "delete_alias"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(template["boundApprovalTypes"], json!(["delete_index", "delete_alias"]));

    let (_, bound) = send(&app, "GET", "/api/workflows/bindings/delete_alias", None).await;
    assert_eq!(bound[0]["id"], "tpl-005");

    let (status, _) = send(&app, "DELETE", "/api/workflows/templates/tpl-001", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn manual_workflow_runs_through_the_console_proxy() {
    let app = app().await;

    let (status, instance) = send(
        &app,
        "POST",
        "/api/workflows/instances",
        Some(json!({
            "templateId": "tpl-003",
            "variables": { "alias": "logs", "oldIndex": "logs-01", "newIndex": "logs-02" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(instance["triggerType"], "manual");
    assert_eq!(instance["createdBy"], "admin");

    let id = instance["id"].as_str().unwrap();
    let done = poll_status(&app, &format!("/api/workflows/instances/{}", id), "running").await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"], 100);

    let (status, _) = send(
        &app,
        "POST",
        "/api/workflows/instances",
        Some(json!({ "templateId": "tpl-missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
