//! In-memory coalescing of click events between flushes.

use std::collections::HashMap;
use std::fmt;

/// Identifier of a flushed click batch.
///
/// Random per flush. The store records it inside the batch transaction so a
/// retried attempt can tell that an earlier attempt already committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(i64);

impl BatchId {
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Immutable snapshot of one batch window, produced when a flush starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickBatch {
    id: BatchId,
    counts: HashMap<String, i64>,
    total: i64,
}

impl ClickBatch {
    /// Builds a batch with a fresh random id.
    ///
    /// Entries with a non-positive count are dropped.
    pub fn new(counts: HashMap<String, i64>) -> Self {
        Self::with_id(BatchId::random(), counts)
    }

    pub fn with_id(id: BatchId, mut counts: HashMap<String, i64>) -> Self {
        counts.retain(|_, count| *count > 0);
        let total = counts.values().sum();
        Self { id, counts, total }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Per-slug counts accumulated in the window.
    pub fn counts(&self) -> &HashMap<String, i64> {
        &self.counts
    }

    /// Count for a single slug, zero when absent.
    pub fn count_for(&self, slug: &str) -> i64 {
        self.counts.get(slug).copied().unwrap_or(0)
    }

    /// Number of distinct slugs in the batch.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts in the batch.
    pub fn total(&self) -> i64 {
        self.total
    }
}

/// Pending per-slug counts owned by the aggregator loop.
///
/// Only the aggregator task touches this value, so it carries no locking.
/// [`ClickAccumulator::take`] swaps the map out instead of clearing it, which
/// starts the next window while the previous one is being persisted.
#[derive(Debug, Default)]
pub struct ClickAccumulator {
    counts: HashMap<String, i64>,
    total_pending: usize,
}

impl ClickAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one click for `slug` and returns the new pending total.
    pub fn record(&mut self, slug: &str) -> usize {
        match self.counts.get_mut(slug) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(slug.to_owned(), 1);
            }
        }
        self.total_pending += 1;
        self.total_pending
    }

    /// Number of clicks recorded since the last [`take`](Self::take).
    pub fn total_pending(&self) -> usize {
        self.total_pending
    }

    pub fn distinct_slugs(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_pending == 0
    }

    /// Swaps the pending counts out as a new batch and resets the window.
    pub fn take(&mut self) -> ClickBatch {
        let counts = std::mem::take(&mut self.counts);
        self.total_pending = 0;
        ClickBatch::new(counts)
    }
}
