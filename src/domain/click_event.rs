//! Click event model for asynchronous click aggregation.

use chrono::{DateTime, Utc};

/// A single visit of a short link.
///
/// Created by the click tracker and handed to whichever path accepts it:
/// the aggregation queue or the synchronous fallback writer. Events are never
/// persisted individually; they only drive the per-slug counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub slug: String,
    pub timestamp: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates a new click event for `slug` observed at `timestamp`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let event = ClickEvent::new("aB3xY9z", Utc::now());
    /// ```
    pub fn new(slug: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            slug: slug.into(),
            timestamp,
        }
    }
}
