//! Aggregated click counters read back from the store.

use chrono::NaiveDate;

/// Click total for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyClicks {
    pub day: NaiveDate,
    pub clicks: i64,
}

/// Lifetime and per-day click counters for a link.
///
/// `daily` is ordered by day, most recent first. The sum of `daily` never
/// exceeds `total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStats {
    pub slug: String,
    pub url: String,
    pub total: i64,
    pub daily: Vec<DailyClicks>,
}

impl LinkStats {
    /// Sum of all daily counters.
    pub fn daily_total(&self) -> i64 {
        self.daily.iter().map(|d| d.clicks).sum()
    }
}
