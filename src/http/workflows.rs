use crate::{
    approval::ApprovalRequestType,
    error::ApiResult,
    metrics::http::{http_request_timer, record_http_request},
    now_millis,
    state::AppState,
    workflow::{
        instance::{ExecutionRecord, NewInstance, WorkflowInstance},
        operation::{AtomicOperation, NewOperation},
        template::{NewTemplate, WorkflowTemplate},
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindingsBody {
    approval_types: Vec<ApprovalRequestType>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows/operations", get(list_operations).post(create_operation))
        .route(
            "/api/workflows/operations/{id}",
            get(get_operation).put(update_operation).delete(delete_operation),
        )
        .route("/api/workflows/templates", get(list_templates).post(create_template))
        .route(
            "/api/workflows/templates/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/api/workflows/templates/{id}/bindings", put(bind_template))
        .route("/api/workflows/bindings/{approval_type}", get(bound_templates))
        .route("/api/workflows/instances", get(list_instances).post(start_instance))
        .route("/api/workflows/instances/{id}", get(get_instance))
        .route("/api/workflows/instances/{id}/cancel", post(cancel_instance))
        .route("/api/workflows/instances/{id}/retry", post(retry_instance))
        .route("/api/workflows/executions", get(executions))
}

async fn list_operations(State(state): State<AppState>) -> Json<Vec<AtomicOperation>> {
    record_http_request("/api/workflows/operations");
    let _timer = http_request_timer("/api/workflows/operations");

    Json(state.workflows.list_operations())
}

async fn create_operation(
    State(state): State<AppState>,
    Json(new): Json<NewOperation>,
) -> ApiResult<(StatusCode, Json<AtomicOperation>)> {
    record_http_request("/api/workflows/operations");
    let _timer = http_request_timer("/api/workflows/operations");

    let operation = state.workflows.create_operation(new, now_millis())?;

    Ok((StatusCode::CREATED, Json(operation)))
}

async fn get_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AtomicOperation>> {
    record_http_request("/api/workflows/operations/{id}");
    let _timer = http_request_timer("/api/workflows/operations/{id}");

    Ok(Json(state.workflows.get_operation(&id)?))
}

async fn update_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(new): Json<NewOperation>,
) -> ApiResult<Json<AtomicOperation>> {
    record_http_request("/api/workflows/operations/{id}");
    let _timer = http_request_timer("/api/workflows/operations/{id}");

    Ok(Json(state.workflows.update_operation(&id, new, now_millis())?))
}

async fn delete_operation(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    record_http_request("/api/workflows/operations/{id}");
    let _timer = http_request_timer("/api/workflows/operations/{id}");

    state.workflows.delete_operation(&id)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_templates(State(state): State<AppState>) -> Json<Vec<WorkflowTemplate>> {
    record_http_request("/api/workflows/templates");
    let _timer = http_request_timer("/api/workflows/templates");

    Json(state.workflows.list_templates())
}

async fn create_template(
    State(state): State<AppState>,
    Json(new): Json<NewTemplate>,
) -> ApiResult<(StatusCode, Json<WorkflowTemplate>)> {
    record_http_request("/api/workflows/templates");
    let _timer = http_request_timer("/api/workflows/templates");

    let template = state.workflows.create_template(new, now_millis())?;

    Ok((StatusCode::CREATED, Json(template)))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowTemplate>> {
    record_http_request("/api/workflows/templates/{id}");
    let _timer = http_request_timer("/api/workflows/templates/{id}");

    Ok(Json(state.workflows.get_template(&id)?))
}

async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(new): Json<NewTemplate>,
) -> ApiResult<Json<WorkflowTemplate>> {
    record_http_request("/api/workflows/templates/{id}");
    let _timer = http_request_timer("/api/workflows/templates/{id}");

    Ok(Json(state.workflows.update_template(&id, new, now_millis())?))
}

async fn delete_template(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    record_http_request("/api/workflows/templates/{id}");
    let _timer = http_request_timer("/api/workflows/templates/{id}");

    state.workflows.delete_template(&id)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn bind_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BindingsBody>,
) -> ApiResult<Json<WorkflowTemplate>> {
    record_http_request("/api/workflows/templates/{id}/bindings");
    let _timer = http_request_timer("/api/workflows/templates/{id}/bindings");

    Ok(Json(state.workflows.bind(&id, body.approval_types, now_millis())?))
}

async fn bound_templates(
    State(state): State<AppState>,
    Path(approval_type): Path<ApprovalRequestType>,
) -> Json<Vec<WorkflowTemplate>> {
    record_http_request("/api/workflows/bindings/{approval_type}");
    let _timer = http_request_timer("/api/workflows/bindings/{approval_type}");

    Json(state.workflows.templates_for(approval_type))
}

async fn list_instances(State(state): State<AppState>) -> Json<Vec<WorkflowInstance>> {
    record_http_request("/api/workflows/instances");
    let _timer = http_request_timer("/api/workflows/instances");

    Json(state.workflows.list_instances())
}

/// Create an instance from a template and start executing it
async fn start_instance(
    State(state): State<AppState>,
    Json(new): Json<NewInstance>,
) -> ApiResult<(StatusCode, Json<WorkflowInstance>)> {
    record_http_request("/api/workflows/instances");
    let _timer = http_request_timer("/api/workflows/instances");

    let instance = state.executor.start(new)?;

    Ok((StatusCode::CREATED, Json(instance)))
}

async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowInstance>> {
    record_http_request("/api/workflows/instances/{id}");
    let _timer = http_request_timer("/api/workflows/instances/{id}");

    Ok(Json(state.workflows.get_instance(&id)?))
}

async fn cancel_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowInstance>> {
    record_http_request("/api/workflows/instances/{id}/cancel");
    let _timer = http_request_timer("/api/workflows/instances/{id}/cancel");

    let instance = state.workflows.cancel(&id, now_millis())?;
    tracing::info!("Workflow {} cancelled", id);

    Ok(Json(instance))
}

async fn retry_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowInstance>> {
    record_http_request("/api/workflows/instances/{id}/retry");
    let _timer = http_request_timer("/api/workflows/instances/{id}/retry");

    Ok(Json(state.executor.retry(&id)?))
}

async fn executions(State(state): State<AppState>) -> Json<Vec<ExecutionRecord>> {
    record_http_request("/api/workflows/executions");
    let _timer = http_request_timer("/api/workflows/executions");

    Json(state.workflows.execution_records())
}
