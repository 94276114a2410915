//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage and counter reads
//! - [`PgClickRepository`] - Batched and single-row click counter upserts

pub mod pg_click_repository;
pub mod pg_link_repository;

pub use pg_click_repository::{MAX_BATCH_SLUGS, PgClickRepository};
pub use pg_link_repository::PgLinkRepository;
