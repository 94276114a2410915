//! Business logic services for the application layer.

pub mod click_tracker;
pub mod link_service;
pub mod stats_service;

pub use click_tracker::{ClickTracker, TrackOutcome};
pub use link_service::LinkService;
pub use stats_service::StatsService;
