//! Handler for link creation.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::links::{CreateLinkRequest, CreateLinkResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::slug::build_short_url;

/// Creates a short link for a long URL.
///
/// # Endpoint
///
/// `POST /api/v1/links`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/some/long/path" }
/// ```
///
/// # Response
///
/// `201 Created` with a `Location` header pointing at the short URL:
///
/// ```json
/// {
///   "id": 1,
///   "slug": "aZ3k9Qx",
///   "short_url": "https://s.example.com/aZ3k9Qx"
/// }
/// ```
///
/// The short URL is built from `BASE_URL` when configured, otherwise from
/// the request's `Host` header.
///
/// # Errors
///
/// Returns 400 Bad Request if the URL is invalid or no base URL can be
/// determined, and 409 Conflict if no free slug was found.
pub async fn create_link_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let base_url = match &state.base_url {
        Some(base) => base.clone(),
        None => base_url_from_host(&headers)?,
    };

    let link = state.link_service.create_link(&payload.url).await?;
    let short_url = build_short_url(&base_url, &link.slug);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, short_url.clone())],
        Json(CreateLinkResponse {
            id: link.id,
            slug: link.slug,
            short_url,
        }),
    ))
}

fn base_url_from_host(headers: &HeaderMap) -> Result<String, AppError> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "Missing Host header",
                json!({ "reason": "BASE_URL is not configured" }),
            )
        })?;

    Ok(format!("http://{host}"))
}
