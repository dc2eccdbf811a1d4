use crate::{
    approval::{
        ApprovalRequest, NewApprovalRequest,
        store::{ApprovalFilter, ApprovalStatistics},
    },
    error::ApiResult,
    metrics::http::{http_request_timer, record_http_request},
    now_millis,
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

/// Body of the review actions; every field is optional except a reject reason
#[derive(Debug, Default, Deserialize)]
struct ReviewBody {
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl ReviewBody {
    fn operator(&self) -> String {
        self.operator
            .clone()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| "admin".to_string())
    }
}

fn review(body: Option<Json<ReviewBody>>) -> ReviewBody {
    body.map(|Json(body)| body).unwrap_or_default()
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/approvals", get(list).post(submit))
        .route("/api/approvals/statistics", get(statistics))
        .route("/api/approvals/{id}", get(get_request))
        .route("/api/approvals/{id}/approve", post(approve))
        .route("/api/approvals/{id}/reject", post(reject))
        .route("/api/approvals/{id}/cancel", post(cancel))
        .route("/api/approvals/{id}/execute", post(execute))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ApprovalFilter>,
) -> Json<Vec<ApprovalRequest>> {
    record_http_request("/api/approvals");
    let _timer = http_request_timer("/api/approvals");

    Json(state.approvals.list(&filter))
}

async fn submit(
    State(state): State<AppState>,
    Json(new): Json<NewApprovalRequest>,
) -> ApiResult<(StatusCode, Json<ApprovalRequest>)> {
    record_http_request("/api/approvals");
    let _timer = http_request_timer("/api/approvals");

    let request = state.approvals.submit(new, now_millis())?;

    Ok((StatusCode::CREATED, Json(request)))
}

async fn statistics(State(state): State<AppState>) -> Json<ApprovalStatistics> {
    record_http_request("/api/approvals/statistics");
    let _timer = http_request_timer("/api/approvals/statistics");

    Json(state.approvals.statistics())
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApprovalRequest>> {
    record_http_request("/api/approvals/{id}");
    let _timer = http_request_timer("/api/approvals/{id}");

    Ok(Json(state.approvals.get(&id)?))
}

/// Approve the current review; a fully approved request starts its bound workflow
async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReviewBody>>,
) -> ApiResult<Json<ApprovalRequest>> {
    record_http_request("/api/approvals/{id}/approve");
    let _timer = http_request_timer("/api/approvals/{id}/approve");

    let body = review(body);
    let operator = body.operator();
    let request = state
        .approvals
        .approve(&id, &operator, body.comment, now_millis())?;

    Ok(Json(state.executor.on_approved(request, &operator)?))
}

async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReviewBody>,
) -> ApiResult<Json<ApprovalRequest>> {
    record_http_request("/api/approvals/{id}/reject");
    let _timer = http_request_timer("/api/approvals/{id}/reject");

    let operator = body.operator();
    let comment = body.comment.unwrap_or_default();

    Ok(Json(
        state
            .approvals
            .reject(&id, &operator, &comment, now_millis())?,
    ))
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReviewBody>>,
) -> ApiResult<Json<ApprovalRequest>> {
    record_http_request("/api/approvals/{id}/cancel");
    let _timer = http_request_timer("/api/approvals/{id}/cancel");

    let operator = review(body).operator();

    Ok(Json(state.approvals.cancel(&id, &operator, now_millis())?))
}

async fn execute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReviewBody>>,
) -> ApiResult<Json<ApprovalRequest>> {
    record_http_request("/api/approvals/{id}/execute");
    let _timer = http_request_timer("/api/approvals/{id}/execute");

    let operator = review(body).operator();

    Ok(Json(state.executor.execute_approval(&id, &operator)?))
}
