//! # Click Shortener
//!
//! Short links over Axum and PostgreSQL, with click counting decoupled from
//! the redirect path.
//!
//! Code is split by dependency direction. [`domain`] holds entities, the
//! repository traits and the click pipeline and depends on nothing else in
//! the crate. [`application`] builds services on those traits.
//! [`infrastructure`] implements them for PostgreSQL, and [`api`] exposes
//! the services over HTTP.
//!
//! ## Click Accounting
//!
//! A redirect offers its visit to a bounded queue and returns. One worker
//! folds queued visits into per-slug counts and writes them as a single
//! transaction of additive upserts once enough are pending or the flush
//! interval elapses. A failing batch is retried with backoff, then written
//! slug by slug. Visits the queue refuses are written synchronously by the
//! handler. Totals can fall short after repeated store failures; they are
//! never inflated.
//!
//! Runtime settings come from the environment, see [`config`]. Migrations
//! are applied by [`server::run`] before the listener binds.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Services, pipeline handles and entities used by the binary and the
/// integration tests.
pub mod prelude {
    pub use crate::application::services::{ClickTracker, LinkService, StatsService, TrackOutcome};
    pub use crate::domain::click_worker::{ClickAggregator, WorkerSettings};
    pub use crate::domain::entities::{Link, LinkStats, NewLink};
    pub use crate::error::{AppError, StoreError};
    pub use crate::state::AppState;
}
