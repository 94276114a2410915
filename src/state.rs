//! Shared application state injected into handlers.

use std::sync::Arc;

use crate::application::services::{ClickTracker, LinkService, StatsService};

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub stats_service: Arc<StatsService>,
    pub click_tracker: ClickTracker,
    /// Public base for short URLs; the request's `Host` is used when unset.
    pub base_url: Option<String>,
}

impl AppState {
    pub fn new(
        link_service: Arc<LinkService>,
        stats_service: Arc<StatsService>,
        click_tracker: ClickTracker,
        base_url: Option<String>,
    ) -> Self {
        Self {
            link_service,
            stats_service,
            click_tracker,
            base_url,
        }
    }
}
