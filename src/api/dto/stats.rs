//! DTOs for link statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{DailyClicks, LinkStats};

/// Persisted click counters for a short link.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub slug: String,
    pub url: String,
    pub total: i64,
    pub daily: Vec<DailyClicksDto>,
}

/// Clicks recorded on one UTC day.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyClicksDto {
    pub day: NaiveDate,
    pub clicks: i64,
}

impl From<DailyClicks> for DailyClicksDto {
    fn from(d: DailyClicks) -> Self {
        Self {
            day: d.day,
            clicks: d.clicks,
        }
    }
}

impl From<LinkStats> for StatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            slug: stats.slug,
            url: stats.url,
            total: stats.total,
            daily: stats.daily.into_iter().map(Into::into).collect(),
        }
    }
}
