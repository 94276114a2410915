//! Repository trait for click counter persistence.

use crate::domain::click_accumulator::{BatchId, ClickBatch};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Result of applying a click batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The counters were incremented by this call.
    Applied,
    /// A previous attempt with the same batch id already committed; nothing
    /// was written.
    AlreadyApplied,
}

/// Additive click counter writes.
///
/// Every operation is an upsert that adds to the existing count, creating
/// the row when absent. Counters never decrease.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Applies a whole batch in one transaction.
    ///
    /// Increments the lifetime counter and the `day` counter of every slug in
    /// the batch by its count. Both upserts commit together or not at all.
    /// The batch id is recorded in the same transaction, so applying a batch
    /// whose id was already committed writes nothing and returns
    /// [`BatchOutcome::AlreadyApplied`].
    async fn apply_batch(&self, batch: &ClickBatch, day: NaiveDate)
    -> Result<BatchOutcome, StoreError>;

    /// Records `id` as spent without writing any counts.
    ///
    /// Returns `true` when this call recorded the id, meaning no batch with
    /// that id has committed and none can commit afterwards. Returns `false`
    /// when a batch with that id already committed.
    async fn fence_batch(&self, id: BatchId) -> Result<bool, StoreError>;

    /// Adds `count` to the lifetime counter of `slug`.
    async fn increment_link_clicks(&self, slug: &str, count: i64) -> Result<(), StoreError>;

    /// Adds `count` to the counter of `slug` for `day`.
    async fn increment_daily_clicks(
        &self,
        slug: &str,
        day: NaiveDate,
        count: i64,
    ) -> Result<(), StoreError>;
}
