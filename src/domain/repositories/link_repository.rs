//! Repository trait for short link data access.

use crate::domain::entities::{Link, LinkStats, NewLink};
use crate::error::StoreError;
use async_trait::async_trait;

/// Repository interface for managing short links.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new short link.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the slug is already taken.
    async fn create(&self, new_link: NewLink) -> Result<Link, StoreError>;

    /// Finds a link by its slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Link>, StoreError>;

    /// Reads the lifetime and daily click counters of a link.
    ///
    /// Returns `Ok(None)` when the slug does not exist. A link that was never
    /// visited has a total of zero and no daily rows.
    async fn get_stats(&self, slug: &str) -> Result<Option<LinkStats>, StoreError>;

    /// Checks store connectivity.
    async fn ping(&self) -> Result<(), StoreError>;
}
