use crate::{
    alerting::{
        channel::{NewChannel, NotificationChannel},
        record::{AlertRecord, RecordFilter},
        rule::{AlertRule, NewRule},
        store::AlertStatistics,
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

#[derive(Debug, Default, Deserialize)]
struct AcknowledgeBody {
    #[serde(default)]
    operator: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/alerts/rules", get(list_rules).post(create_rule))
        .route(
            "/api/alerts/rules/{id}",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/api/alerts/rules/{id}/toggle", post(toggle_rule))
        .route("/api/alerts/records", get(list_records))
        .route("/api/alerts/records/{id}", get(get_record))
        .route("/api/alerts/records/{id}/acknowledge", post(acknowledge))
        .route("/api/alerts/records/{id}/resolve", post(resolve))
        .route("/api/alerts/channels", get(list_channels).post(create_channel))
        .route(
            "/api/alerts/channels/{id}",
            get(get_channel).put(update_channel).delete(delete_channel),
        )
        .route("/api/alerts/channels/{id}/toggle", post(toggle_channel))
        .route("/api/alerts/statistics", get(statistics))
}

async fn list_rules(State(state): State<AppState>) -> Json<Vec<AlertRule>> {
    record_http_request("/api/alerts/rules");
    let _timer = http_request_timer("/api/alerts/rules");

    Json(state.alerts.list_rules())
}

async fn create_rule(
    State(state): State<AppState>,
    Json(rule): Json<NewRule>,
) -> ApiResult<(StatusCode, Json<AlertRule>)> {
    record_http_request("/api/alerts/rules");
    let _timer = http_request_timer("/api/alerts/rules");

    let rule = state.alerts.create_rule(rule, now_millis())?;
    tracing::info!("Alert rule {} created", rule.id);

    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_rule(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<AlertRule>> {
    record_http_request("/api/alerts/rules/{id}");
    let _timer = http_request_timer("/api/alerts/rules/{id}");

    Ok(Json(state.alerts.get_rule(&id)?))
}

async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(rule): Json<NewRule>,
) -> ApiResult<Json<AlertRule>> {
    record_http_request("/api/alerts/rules/{id}");
    let _timer = http_request_timer("/api/alerts/rules/{id}");

    Ok(Json(state.alerts.update_rule(&id, rule, now_millis())?))
}

async fn delete_rule(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    record_http_request("/api/alerts/rules/{id}");
    let _timer = http_request_timer("/api/alerts/rules/{id}");

    state.alerts.delete_rule(&id)?;
    tracing::info!("Alert rule {} deleted", id);

    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_rule(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<AlertRule>> {
    record_http_request("/api/alerts/rules/{id}/toggle");
    let _timer = http_request_timer("/api/alerts/rules/{id}/toggle");

    Ok(Json(state.alerts.toggle_rule(&id, now_millis())?))
}

async fn list_records(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Json<Vec<AlertRecord>> {
    record_http_request("/api/alerts/records");
    let _timer = http_request_timer("/api/alerts/records");

    Json(state.alerts.list_records(&filter))
}

async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<AlertRecord>> {
    record_http_request("/api/alerts/records/{id}");
    let _timer = http_request_timer("/api/alerts/records/{id}");

    Ok(Json(state.alerts.get_record(&id)?))
}

async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<AcknowledgeBody>>,
) -> ApiResult<Json<AlertRecord>> {
    record_http_request("/api/alerts/records/{id}/acknowledge");
    let _timer = http_request_timer("/api/alerts/records/{id}/acknowledge");

    let operator = body
        .and_then(|Json(body)| body.operator)
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| "admin".to_string());

    Ok(Json(state.alerts.acknowledge(&id, &operator, now_millis())?))
}

async fn resolve(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<AlertRecord>> {
    record_http_request("/api/alerts/records/{id}/resolve");
    let _timer = http_request_timer("/api/alerts/records/{id}/resolve");

    Ok(Json(state.alerts.resolve(&id, now_millis())?))
}

async fn list_channels(State(state): State<AppState>) -> Json<Vec<NotificationChannel>> {
    record_http_request("/api/alerts/channels");
    let _timer = http_request_timer("/api/alerts/channels");

    Json(state.alerts.list_channels())
}

async fn create_channel(
    State(state): State<AppState>,
    Json(channel): Json<NewChannel>,
) -> ApiResult<(StatusCode, Json<NotificationChannel>)> {
    record_http_request("/api/alerts/channels");
    let _timer = http_request_timer("/api/alerts/channels");

    let channel = state.alerts.create_channel(channel, now_millis())?;
    tracing::info!("Notification channel {} ({}) created", channel.id, channel.channel_type);

    Ok((StatusCode::CREATED, Json(channel)))
}

async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NotificationChannel>> {
    record_http_request("/api/alerts/channels/{id}");
    let _timer = http_request_timer("/api/alerts/channels/{id}");

    Ok(Json(state.alerts.get_channel(&id)?))
}

async fn update_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(channel): Json<NewChannel>,
) -> ApiResult<Json<NotificationChannel>> {
    record_http_request("/api/alerts/channels/{id}");
    let _timer = http_request_timer("/api/alerts/channels/{id}");

    Ok(Json(state.alerts.update_channel(&id, channel, now_millis())?))
}

async fn delete_channel(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    record_http_request("/api/alerts/channels/{id}");
    let _timer = http_request_timer("/api/alerts/channels/{id}");

    state.alerts.delete_channel(&id)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NotificationChannel>> {
    record_http_request("/api/alerts/channels/{id}/toggle");
    let _timer = http_request_timer("/api/alerts/channels/{id}/toggle");

    Ok(Json(state.alerts.toggle_channel(&id, now_millis())?))
}

async fn statistics(State(state): State<AppState>) -> Json<AlertStatistics> {
    record_http_request("/api/alerts/statistics");
    let _timer = http_request_timer("/api/alerts/statistics");

    Json(state.alerts.statistics(now_millis()))
}
