//! Handler for link statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::stats::StatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns persisted click counters for a short link.
///
/// # Endpoint
///
/// `GET /api/v1/links/{slug}/stats`
///
/// # Response
///
/// ```json
/// {
///   "slug": "aZ3k9Qx",
///   "url": "https://example.com",
///   "total": 42,
///   "daily": [
///     { "day": "2026-10-15", "clicks": 30 },
///     { "day": "2026-10-14", "clicks": 12 }
///   ]
/// }
/// ```
///
/// Clicks still waiting in the aggregator appear after the next flush.
///
/// # Errors
///
/// Returns 404 Not Found if the slug doesn't exist.
pub async fn stats_handler(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.stats_service.get_stats(&slug).await?;
    Ok(Json(stats.into()))
}
