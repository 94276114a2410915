//! Transactional persistence of click batches with bounded retry.
//!
//! A batch is written as two multi-row additive upserts (lifetime and
//! today's counters) inside one transaction. Failed attempts are rolled back
//! and retried with exponential backoff. Every flush runs against a single
//! deadline that covers the attempts, the fence and any fallback writes.
//!
//! A failed attempt may still have committed, for instance when the
//! acknowledgement was lost or the attempt timed out during commit. Before
//! degrading, the batch id is fenced: if the batch turns out to be
//! committed nothing more is written; if the fence itself fails the counts
//! are dropped. Otherwise the batch goes through one
//! [`FallbackWriter::apply_until`] call per slug until the deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout, timeout_at};
use tokio_retry::Retry;
use tracing::{debug, error, warn};

use crate::domain::click_accumulator::ClickBatch;
use crate::domain::clock::Clock;
use crate::domain::fallback_writer::{FallbackReason, FallbackWriter};
use crate::domain::repositories::{BatchOutcome, ClickRepository};
use crate::error::StoreError;

/// Retry and time budget for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles for every further attempt.
    pub base_delay: Duration,
    /// Upper bound for a single attempt.
    pub attempt_timeout: Duration,
    /// Upper bound for the whole flush, fallback writes included.
    pub transaction_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(125),
            attempt_timeout: Duration::from_millis(1500),
            transaction_timeout: Duration::from_secs(6),
        }
    }
}

impl RetryPolicy {
    /// Delays slept between attempts: `base, 2*base, 4*base, ...`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        std::iter::successors(Some(self.base_delay), |d| d.checked_mul(2))
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// How a flush concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to write.
    Empty,
    /// The batch transaction committed.
    Committed { slugs: usize, clicks: i64 },
    /// Every attempt failed; the batch went through the fallback writer.
    /// `dropped_slugs` were skipped because the deadline had passed.
    Degraded {
        slugs: usize,
        clicks: i64,
        dropped_slugs: usize,
    },
    /// Whether the batch committed could not be established; nothing more
    /// was written.
    Dropped { slugs: usize, clicks: i64 },
}

/// Writes click batches to the store.
pub struct BatchPersister {
    repository: Arc<dyn ClickRepository>,
    fallback: FallbackWriter,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl BatchPersister {
    pub fn new(
        repository: Arc<dyn ClickRepository>,
        fallback: FallbackWriter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            fallback,
            clock,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Persists `batch`, degrading to per-slug fallback writes on failure.
    ///
    /// Returns within the policy's `transaction_timeout` and never returns
    /// an error: the outcome only reports which path was taken.
    pub async fn persist(&self, batch: ClickBatch) -> FlushOutcome {
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }

        let deadline = Instant::now() + self.policy.transaction_timeout;
        let slugs = batch.len();
        let clicks = batch.total();

        let failure = match self.commit_with_retry(&batch, deadline).await {
            Ok(outcome) => {
                debug!(
                    batch_id = %batch.id(),
                    unique_slugs = slugs,
                    clicks,
                    already_applied = outcome == BatchOutcome::AlreadyApplied,
                    "Click batch flushed"
                );
                return FlushOutcome::Committed { slugs, clicks };
            }
            Err(e) => e,
        };

        let fence = timeout(
            self.remaining(deadline),
            self.repository.fence_batch(batch.id()),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout));

        match fence {
            Ok(false) => {
                warn!(
                    batch_id = %batch.id(),
                    unique_slugs = slugs,
                    clicks,
                    error = %failure,
                    "Click batch reported failure but had committed"
                );
                FlushOutcome::Committed { slugs, clicks }
            }
            Ok(true) => {
                error!(
                    batch_id = %batch.id(),
                    unique_slugs = slugs,
                    clicks,
                    error = %failure,
                    "Click batch upsert failed; falling back to per-slug writes"
                );
                let dropped_slugs = self.fall_back(&batch, deadline).await;
                FlushOutcome::Degraded {
                    slugs,
                    clicks,
                    dropped_slugs,
                }
            }
            Err(fence_error) => {
                error!(
                    batch_id = %batch.id(),
                    unique_slugs = slugs,
                    clicks,
                    error = %failure,
                    fence_error = %fence_error,
                    "Click batch state unknown; dropping its counts"
                );
                FlushOutcome::Dropped { slugs, clicks }
            }
        }
    }

    fn remaining(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(Instant::now())
    }

    /// Returns the number of slugs skipped once the deadline passed.
    async fn fall_back(&self, batch: &ClickBatch, deadline: Instant) -> usize {
        let mut dropped_slugs = 0;
        let mut dropped_clicks = 0;

        for (slug, count) in batch.counts() {
            if Instant::now() >= deadline {
                dropped_slugs += 1;
                dropped_clicks += *count;
                continue;
            }
            self.fallback
                .apply_until(slug, *count, FallbackReason::BatchExhausted, deadline)
                .await;
        }

        if dropped_slugs > 0 {
            error!(
                batch_id = %batch.id(),
                dropped_slugs,
                dropped_clicks,
                "Flush deadline reached; remaining click counts dropped"
            );
        }
        dropped_slugs
    }

    async fn commit_with_retry(
        &self,
        batch: &ClickBatch,
        deadline: Instant,
    ) -> Result<BatchOutcome, StoreError> {
        let day = self.clock.today();
        let max_attempts = self.policy.max_attempts;
        let attempt_timeout = self.policy.attempt_timeout;
        let mut attempt = 0usize;

        let attempts = Retry::spawn(self.policy.delays(), || {
            attempt += 1;
            let current = attempt;
            let repository = Arc::clone(&self.repository);
            let limit = attempt_timeout.min(self.remaining(deadline));
            async move {
                timeout(limit, repository.apply_batch(batch, day))
                    .await
                    .unwrap_or(Err(StoreError::Timeout))
                    .inspect_err(|e| {
                        if current < max_attempts {
                            warn!(
                                batch_id = %batch.id(),
                                attempt = current,
                                max_attempts,
                                error = %e,
                                "Retrying click batch upsert"
                            );
                        }
                    })
            }
        });

        timeout_at(deadline, attempts)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }
}
