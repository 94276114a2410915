//! Background click aggregation worker.
//!
//! A single tokio task owns a [`ClickAccumulator`] and waits on three
//! sources: the bounded event channel, a flush-interval ticker, and the
//! shutdown signal. Events bump the pending counts; reaching the batch size
//! flushes immediately, ticks flush whatever is pending, and shutdown closes
//! admission, drains the channel, flushes once more and reports termination.
//!
//! Flushes are awaited inside the loop. Events arriving meanwhile wait in
//! the channel, bounded by its capacity; producers are never blocked because
//! [`ClickAggregator::enqueue`] only ever attempts a non-blocking send.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::domain::batch_persister::{BatchPersister, FlushOutcome};
use crate::domain::click_accumulator::ClickAccumulator;
use crate::domain::click_event::ClickEvent;

/// Tuning for the aggregation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Pending clicks that trigger an immediate flush.
    pub batch_size: usize,
    /// Maximum time pending clicks wait before a flush.
    pub flush_interval: Duration,
    /// Capacity of the event channel.
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            batch_size: 400,
            flush_interval: Duration::from_millis(250),
            queue_capacity: 8192,
        }
    }
}

/// Reason an event was not admitted to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// The channel is at capacity.
    Full,
    /// Shutdown has begun or the worker has stopped.
    Closed,
}

struct Shared {
    closing: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    terminated_rx: watch::Receiver<bool>,
    capacity: usize,
}

/// Handle to the running aggregation worker.
///
/// Cheap to clone; every clone feeds the same worker. Passed explicitly to
/// the components that produce click events.
#[derive(Clone)]
pub struct ClickAggregator {
    sender: mpsc::Sender<ClickEvent>,
    shared: Arc<Shared>,
}

impl ClickAggregator {
    /// Spawns the worker task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `settings.queue_capacity` is zero or if called outside a
    /// tokio runtime.
    pub fn spawn(settings: WorkerSettings, persister: BatchPersister) -> Self {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (terminated_tx, terminated_rx) = watch::channel(false);

        tokio::spawn(run_click_worker(
            receiver,
            shutdown_rx,
            terminated_tx,
            settings,
            persister,
        ));

        Self {
            sender,
            shared: Arc::new(Shared {
                closing: AtomicBool::new(false),
                shutdown_tx,
                terminated_rx,
                capacity: settings.queue_capacity,
            }),
        }
    }

    /// Offers an event to the worker without waiting.
    ///
    /// Returns `true` when the worker took ownership of the event.
    pub fn enqueue(&self, event: ClickEvent) -> bool {
        self.try_enqueue(event).is_ok()
    }

    /// Like [`enqueue`](Self::enqueue), reporting why an event was refused.
    pub fn try_enqueue(&self, event: ClickEvent) -> Result<(), Rejected> {
        if self.shared.closing.load(Ordering::Acquire) {
            return Err(Rejected::Closed);
        }

        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(Rejected::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Rejected::Closed),
        }
    }

    /// Free slots in the event channel.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    /// Configured capacity of the event channel.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns true once shutdown has begun or the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.shared.closing.load(Ordering::Acquire) || self.sender.is_closed()
    }

    /// Stops admission, drains and flushes pending clicks, and waits for the
    /// worker to terminate.
    ///
    /// Idempotent: every caller returns once the worker has stopped.
    pub async fn shutdown(&self) {
        self.shared.closing.store(true, Ordering::Release);
        self.shared.shutdown_tx.send_replace(true);

        let mut terminated = self.shared.terminated_rx.clone();
        // An error means the worker task is gone, which is also terminal.
        let _ = terminated.wait_for(|done| *done).await;
    }
}

async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    terminated_tx: watch::Sender<bool>,
    settings: WorkerSettings,
    persister: BatchPersister,
) {
    let mut ticker = interval_at(
        Instant::now() + settings.flush_interval,
        settings.flush_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut accumulator = ClickAccumulator::new();

    info!(
        batch_size = settings.batch_size,
        flush_interval_ms = settings.flush_interval.as_millis() as u64,
        queue_capacity = settings.queue_capacity,
        "Click worker started"
    );

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => {
                    if accumulator.record(&event.slug) >= settings.batch_size {
                        flush(&mut accumulator, &persister, "size").await;
                    }
                }
                None => {
                    debug!("Click channel closed by all producers");
                    break;
                }
            },
            _ = ticker.tick() => {
                if !accumulator.is_empty() {
                    flush(&mut accumulator, &persister, "interval").await;
                }
            }
            // The value only ever flips to `true`; a dropped sender means every
            // handle is gone, which is handled the same way.
            _ = shutdown_rx.changed() => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    if accumulator.record(&event.slug) >= settings.batch_size {
                        flush(&mut accumulator, &persister, "size").await;
                    }
                }
                break;
            }
        }
    }

    flush(&mut accumulator, &persister, "shutdown").await;
    info!("Click worker stopped");
    terminated_tx.send_replace(true);
}

async fn flush(accumulator: &mut ClickAccumulator, persister: &BatchPersister, trigger: &str) {
    if accumulator.is_empty() {
        return;
    }

    let batch = accumulator.take();
    debug!(
        trigger,
        batch_id = %batch.id(),
        unique_slugs = batch.len(),
        clicks = batch.total(),
        "Flushing click batch"
    );

    match persister.persist(batch).await {
        FlushOutcome::Degraded {
            slugs,
            dropped_slugs,
            ..
        } => {
            debug!(
                trigger,
                unique_slugs = slugs,
                dropped_slugs,
                "Click batch degraded to fallback"
            );
        }
        FlushOutcome::Dropped { slugs, .. } => {
            debug!(trigger, unique_slugs = slugs, "Click batch dropped");
        }
        FlushOutcome::Empty | FlushOutcome::Committed { .. } => {}
    }
}
