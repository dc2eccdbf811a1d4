use crate::{
    console::{ConsoleRequest, ConsoleTemplate, HistoryEntry, NewConsoleTemplate, examples::ExampleCategory},
    error::ApiResult,
    metrics::http::{http_request_timer, record_http_request},
    now_millis,
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/console/execute", post(execute))
        .route("/api/console/history", get(history).delete(clear_history))
        .route("/api/console/templates", get(list_templates).post(create_template))
        .route(
            "/api/console/templates/{id}",
            put(update_template).delete(delete_template),
        )
        .route("/api/console/categories", get(categories))
}

/// Send a raw request to Elasticsearch through the Kibana console proxy
async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ConsoleRequest>,
) -> ApiResult<Json<HistoryEntry>> {
    record_http_request("/api/console/execute");
    let _timer = http_request_timer("/api/console/execute");

    Ok(Json(state.console.execute(request, now_millis()).await?))
}

async fn history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    record_http_request("/api/console/history");
    let _timer = http_request_timer("/api/console/history");

    Json(state.console.history())
}

async fn clear_history(State(state): State<AppState>) -> StatusCode {
    record_http_request("/api/console/history");
    let _timer = http_request_timer("/api/console/history");

    state.console.clear_history();

    StatusCode::NO_CONTENT
}

async fn list_templates(State(state): State<AppState>) -> Json<Vec<ConsoleTemplate>> {
    record_http_request("/api/console/templates");
    let _timer = http_request_timer("/api/console/templates");

    Json(state.console.list_templates())
}

async fn create_template(
    State(state): State<AppState>,
    Json(new): Json<NewConsoleTemplate>,
) -> ApiResult<(StatusCode, Json<ConsoleTemplate>)> {
    record_http_request("/api/console/templates");
    let _timer = http_request_timer("/api/console/templates");

    Ok((StatusCode::CREATED, Json(state.console.create_template(new)?)))
}

async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(new): Json<NewConsoleTemplate>,
) -> ApiResult<Json<ConsoleTemplate>> {
    record_http_request("/api/console/templates/{id}");
    let _timer = http_request_timer("/api/console/templates/{id}");

    Ok(Json(state.console.update_template(&id, new)?))
}

async fn delete_template(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    record_http_request("/api/console/templates/{id}");
    let _timer = http_request_timer("/api/console/templates/{id}");

    state.console.delete_template(&id)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn categories(State(state): State<AppState>) -> Json<Vec<ExampleCategory>> {
    record_http_request("/api/console/categories");
    let _timer = http_request_timer("/api/console/categories");

    Json(state.console.categories())
}
