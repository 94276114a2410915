//! Producer side of click aggregation.

use std::sync::Arc;

use tracing::warn;

use crate::domain::click_event::ClickEvent;
use crate::domain::click_worker::{ClickAggregator, Rejected};
use crate::domain::clock::Clock;
use crate::domain::fallback_writer::{FallbackReason, FallbackWriter};

/// How a click was accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The aggregator accepted the event.
    Queued,
    /// The click was written synchronously through the fallback writer.
    Fallback(FallbackReason),
}

/// Records visits without ever failing the request that caused them.
///
/// Offers each click to the aggregator; when the queue refuses it, or no
/// aggregator is configured, writes `+1` synchronously instead.
#[derive(Clone)]
pub struct ClickTracker {
    aggregator: Option<ClickAggregator>,
    fallback: FallbackWriter,
    clock: Arc<dyn Clock>,
}

impl ClickTracker {
    pub fn new(
        aggregator: Option<ClickAggregator>,
        fallback: FallbackWriter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            aggregator,
            fallback,
            clock,
        }
    }

    /// The aggregator handle, if aggregation is enabled.
    pub fn aggregator(&self) -> Option<&ClickAggregator> {
        self.aggregator.as_ref()
    }

    /// Accounts one visit of `slug`.
    pub async fn track(&self, slug: &str) -> TrackOutcome {
        let reason = match &self.aggregator {
            Some(aggregator) => {
                match aggregator.try_enqueue(ClickEvent::new(slug, self.clock.now())) {
                    Ok(()) => return TrackOutcome::Queued,
                    Err(Rejected::Full) => FallbackReason::QueueFull,
                    Err(Rejected::Closed) => FallbackReason::QueueClosed,
                }
            }
            None => FallbackReason::NoAggregator,
        };

        if reason != FallbackReason::NoAggregator {
            warn!(slug, %reason, "Click queue refused event; writing synchronously");
        }
        self.fallback.apply(slug, 1, reason).await;
        TrackOutcome::Fallback(reason)
    }
}
