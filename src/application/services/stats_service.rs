//! Click statistics service.

use std::sync::Arc;

use crate::domain::entities::LinkStats;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use serde_json::json;

/// Service for reading the persisted click counters of a link.
///
/// Counts reflect flushed batches only; clicks still pending in the
/// aggregator are not visible until the next flush.
pub struct StatsService<R: LinkRepository + ?Sized = dyn LinkRepository> {
    repository: Arc<R>,
}

impl<R: LinkRepository + ?Sized> StatsService<R> {
    /// Creates a new statistics service.
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Retrieves lifetime and per-day counters for `slug`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this slug.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn get_stats(&self, slug: &str) -> Result<LinkStats, AppError> {
        self.repository
            .get_stats(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Statistics not found", json!({ "slug": slug })))
    }
}
