use crate::{
    config::Config,
    metrics::{
        METRICS_HANDLE,
        http::{http_request_timer, record_http_request},
    },
    state::AppState,
};
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;

mod alerts;
mod approvals;
mod console;
mod monitor;
mod workflows;

/// Bind the configured address and serve the API until the process exits
pub async fn create_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    tracing::info!("Starting the web server");

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Unable to parse listen address: {}", e))?;

    tracing::info!("Listening on {}", addr);

    axum_server::bind(addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

/// Create the router for the application
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/alive", get(alive))
        .route("/metrics", get(metrics))
        .merge(monitor::routes())
        .merge(alerts::routes())
        .merge(approvals::routes())
        .merge(workflows::routes())
        .merge(console::routes())
        .with_state(state)
}

/// This is the handler for the /alive path
async fn alive() -> StatusCode {
    record_http_request("/alive");
    let _timer = http_request_timer("/alive");

    StatusCode::OK
}

/// This is the handler for the /metrics path
#[tracing::instrument]
async fn metrics() -> impl IntoResponse {
    record_http_request("/metrics");
    let _timer = http_request_timer("/metrics");

    match METRICS_HANDLE.get().and_then(Option::as_ref) {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to get the metrics handle".to_string(),
        ),
    }
}
