//! `GET /healthz`.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Reports whether the store answers and the click queue accepts events.
///
/// Responds `200` with `"status": "healthy"` when every check is `ok`, and
/// `503` with `"degraded"` otherwise. A disabled aggregator counts as `ok`;
/// a queue that is shutting down does not.
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "click_queue": { "status": "ok", "message": "Available: 8190/8192" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let db_check = check_database(&state).await;
    let queue_check = check_click_queue(&state);

    let all_healthy = db_check.is_ok() && queue_check.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database: db_check,
            click_queue: queue_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.link_service.check_store().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {e}")),
    }
}

/// A disabled aggregator reports `ok`: every click is then written
/// synchronously.
fn check_click_queue(state: &AppState) -> CheckStatus {
    match state.click_tracker.aggregator() {
        None => CheckStatus::ok("Aggregation disabled; clicks are written synchronously"),
        Some(aggregator) if aggregator.is_closed() => {
            CheckStatus::error("Click queue is closed")
        }
        Some(aggregator) => CheckStatus::ok(format!(
            "Available: {}/{}",
            aggregator.available(),
            aggregator.capacity()
        )),
    }
}
