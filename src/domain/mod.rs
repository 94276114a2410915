//! Domain layer: entities, repository contracts and the click aggregation
//! pipeline.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click event model
//! - [`click_accumulator`] - Per-slug coalescing between flushes
//! - [`click_worker`] - Aggregation worker and its handle
//! - [`batch_persister`] - Transactional batch writes with bounded retry
//! - [`fallback_writer`] - Best-effort single-row writes
//! - [`clock`] - Injectable calendar source for daily buckets
//!
//! # Click Processing Flow
//!
//! 1. The redirect handler asks the click tracker to record a visit, which
//!    builds a [`click_event::ClickEvent`]
//! 2. [`click_worker::ClickAggregator::try_enqueue`] offers it to the bounded channel
//! 3. If refused, the tracker writes `+1` through [`fallback_writer::FallbackWriter`]
//! 4. The worker coalesces events and flushes on size or interval
//! 5. [`batch_persister::BatchPersister`] commits both counter upserts in one
//!    transaction, degrading to per-slug fallback writes after repeated failure

pub mod batch_persister;
pub mod click_accumulator;
pub mod click_event;
pub mod click_worker;
pub mod clock;
pub mod entities;
pub mod fallback_writer;
pub mod repositories;
