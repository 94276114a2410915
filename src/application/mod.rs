//! Application layer services implementing business logic.
//!
//! Services consume repository traits and the click pipeline and provide a
//! small API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Link creation and slug resolution
//! - [`services::stats_service::StatsService`] - Click counter reads
//! - [`services::click_tracker::ClickTracker`] - Producer side of click aggregation

pub mod services;
