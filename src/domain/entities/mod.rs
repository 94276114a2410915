//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A shortened URL mapping
//! - [`LinkStats`] - Lifetime and per-day click counters for a link
//!
//! Creation inputs use separate structs (`NewLink`).

pub mod link;
pub mod stats;

pub use link::{Link, NewLink};
pub use stats::{DailyClicks, LinkStats};
