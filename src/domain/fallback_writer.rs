//! Best-effort single-row click persistence.
//!
//! Used when the batched path is unavailable (queue full, aggregator not
//! running or shutting down) or has exhausted its retries. Each call makes
//! two independent additive upserts, each under its own timeout. Failures
//! are logged and dropped; nothing is retried and nothing is returned to the
//! caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};
use tracing::{debug, error};

use crate::domain::clock::Clock;
use crate::domain::repositories::ClickRepository;
use crate::error::StoreError;

/// Per-write timeout for fallback upserts.
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a click took the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The aggregation queue was at capacity.
    QueueFull,
    /// The aggregator is shutting down or has stopped.
    QueueClosed,
    /// Click aggregation is disabled in this deployment.
    NoAggregator,
    /// The batched transaction failed on every attempt.
    BatchExhausted,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::QueueFull => "queue full",
            FallbackReason::QueueClosed => "queue closed",
            FallbackReason::NoAggregator => "no aggregator",
            FallbackReason::BatchExhausted => "batch retries exhausted",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes click increments one slug at a time.
#[derive(Clone)]
pub struct FallbackWriter {
    repository: Arc<dyn ClickRepository>,
    clock: Arc<dyn Clock>,
    write_timeout: Duration,
}

impl FallbackWriter {
    pub fn new(repository: Arc<dyn ClickRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            write_timeout: DEFAULT_FALLBACK_TIMEOUT,
        }
    }

    /// Overrides the per-write timeout.
    pub fn with_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Adds `count` clicks for `slug` to the lifetime and today's counters.
    ///
    /// The two writes are independent: one may succeed while the other
    /// fails, which leaves the tables diverged for that slug and day.
    pub async fn apply(&self, slug: &str, count: i64, reason: FallbackReason) {
        self.write(slug, count, reason, None).await;
    }

    /// Like [`apply`](Self::apply), with both writes also bounded by
    /// `deadline`. A write started at or after the deadline fails unless
    /// the store answers immediately.
    pub async fn apply_until(
        &self,
        slug: &str,
        count: i64,
        reason: FallbackReason,
        deadline: Instant,
    ) -> bool {
        self.write(slug, count, reason, Some(deadline)).await
    }

    fn write_limit(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(deadline) => self
                .write_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.write_timeout,
        }
    }

    async fn write(
        &self,
        slug: &str,
        count: i64,
        reason: FallbackReason,
        deadline: Option<Instant>,
    ) -> bool {
        if count <= 0 {
            return true;
        }

        let day = self.clock.today();

        let link_write = timeout(
            self.write_limit(deadline),
            self.repository.increment_link_clicks(slug, count),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout));
        if let Err(e) = &link_write {
            error!(slug, count, %reason, error = %e, "Fallback lifetime click write failed");
        }

        let daily_write = timeout(
            self.write_limit(deadline),
            self.repository.increment_daily_clicks(slug, day, count),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout));
        if let Err(e) = &daily_write {
            error!(slug, count, %day, %reason, error = %e, "Fallback daily click write failed");
        }

        let written = link_write.is_ok() && daily_write.is_ok();
        debug!(slug, count, %reason, written, "Fallback click increment");
        written
    }
}
