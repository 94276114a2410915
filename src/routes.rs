//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{slug}`     - Short link redirect (public, also `HEAD`)
//! - `GET  /healthz`    - Health check: DB, click queue (public)
//! - `/api/v1/*`        - REST API (rate limited)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on the API
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::rate_limit::RateLimit;
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Application routes with request tracing.
///
/// `api_router` is mounted under `/api/v1` as given; [`app_router`] passes
/// it rate limited and adds trailing-slash normalization on top.
pub fn base_router(api_router: Router<AppState>, state: AppState) -> Router {
    Router::new()
        .route("/{slug}", get(redirect_handler))
        .route("/healthz", get(health_handler))
        .nest("/api/v1", api_router)
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `rate_limit` - per-client limiter layered over `/api/v1`; keep a clone
///   to sweep idle clients
pub fn app_router(state: AppState, rate_limit: &RateLimit) -> NormalizePath<Router> {
    let api_router = rate_limit.apply(api::routes::routes());

    NormalizePathLayer::trim_trailing_slash().layer(base_router(api_router, state))
}
