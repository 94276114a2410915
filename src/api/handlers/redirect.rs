//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::slug::is_valid_slug;

/// Redirects a slug to its original URL and records the visit.
///
/// # Endpoint
///
/// `GET /{slug}` (also answers `HEAD`)
///
/// # Request Flow
///
/// 1. Reject slugs that cannot exist without touching the database
/// 2. Resolve the slug to its link
/// 3. Hand the click to the tracker (queued, or written synchronously when
///    the queue refuses it)
/// 4. Return 302 Found
///
/// Click accounting never fails the redirect.
///
/// # Errors
///
/// Returns 404 Not Found if the slug doesn't exist.
pub async fn redirect_handler(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if !is_valid_slug(&slug) {
        return Err(AppError::not_found(
            "Short link not found",
            json!({ "slug": slug }),
        ));
    }

    let link = state.link_service.resolve(&slug).await?;

    let outcome = state.click_tracker.track(&link.slug).await;
    debug!(slug = %link.slug, ?outcome, "Redirecting");

    Ok((StatusCode::FOUND, [(header::LOCATION, link.url)]))
}
