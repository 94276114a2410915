#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use click_shortener::application::services::{ClickTracker, LinkService, StatsService};
use click_shortener::domain::batch_persister::BatchPersister;
use click_shortener::domain::click_accumulator::{BatchId, ClickBatch};
use click_shortener::domain::click_worker::{ClickAggregator, WorkerSettings};
use click_shortener::domain::clock::{Clock, FixedClock};
use click_shortener::domain::entities::{DailyClicks, Link, LinkStats, NewLink};
use click_shortener::domain::fallback_writer::FallbackWriter;
use click_shortener::domain::repositories::{BatchOutcome, ClickRepository, LinkRepository};
use click_shortener::error::StoreError;
use click_shortener::state::AppState;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 8, 30, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(now()))
}

#[derive(Default)]
struct ClickStore {
    link: HashMap<String, i64>,
    daily: HashMap<(String, NaiveDate), i64>,
    applied: HashSet<i64>,
    committed: Vec<HashMap<String, i64>>,
    attempts: usize,
    fail_next: usize,
    lose_ack_next: usize,
    fail_single_writes: bool,
    single_writes: Vec<(String, i64)>,
    ack_delay: Option<Duration>,
    hung: bool,
    fences: usize,
}

/// In-memory click counters with fault injection.
#[derive(Default)]
pub struct MemoryClickRepository {
    store: Mutex<ClickStore>,
}

impl MemoryClickRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next `n` batch attempts fail before writing anything.
    pub fn fail_next_batches(&self, n: usize) {
        self.store.lock().unwrap().fail_next = n;
    }

    /// The next `n` batch attempts commit but report a failure.
    pub fn lose_next_acks(&self, n: usize) {
        self.store.lock().unwrap().lose_ack_next = n;
    }

    /// Batch attempts commit, then wait `delay` before acknowledging.
    pub fn delay_acks(&self, delay: Duration) {
        self.store.lock().unwrap().ack_delay = Some(delay);
    }

    /// Every call waits forever, as against a store that stopped answering.
    pub fn hang(&self) {
        self.store.lock().unwrap().hung = true;
    }

    pub fn fence_calls(&self) -> usize {
        self.store.lock().unwrap().fences
    }

    fn is_hung(&self) -> bool {
        self.store.lock().unwrap().hung
    }

    pub fn fail_single_writes(&self, fail: bool) {
        self.store.lock().unwrap().fail_single_writes = fail;
    }

    pub fn link_clicks(&self, slug: &str) -> i64 {
        self.store
            .lock()
            .unwrap()
            .link
            .get(slug)
            .copied()
            .unwrap_or(0)
    }

    pub fn daily_clicks(&self, slug: &str, day: NaiveDate) -> i64 {
        self.store
            .lock()
            .unwrap()
            .daily
            .get(&(slug.to_string(), day))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_link_clicks(&self) -> i64 {
        self.store.lock().unwrap().link.values().sum()
    }

    pub fn total_daily_clicks(&self) -> i64 {
        self.store.lock().unwrap().daily.values().sum()
    }

    /// Daily rows of `slug`, most recent first.
    pub fn daily_rows(&self, slug: &str) -> Vec<DailyClicks> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<DailyClicks> = store
            .daily
            .iter()
            .filter(|((s, _), _)| s == slug)
            .map(|((_, day), clicks)| DailyClicks {
                day: *day,
                clicks: *clicks,
            })
            .collect();
        rows.sort_by(|a, b| b.day.cmp(&a.day));
        rows
    }

    /// Counts of every batch that committed, in commit order.
    pub fn committed_batches(&self) -> Vec<HashMap<String, i64>> {
        self.store.lock().unwrap().committed.clone()
    }

    pub fn batch_attempts(&self) -> usize {
        self.store.lock().unwrap().attempts
    }

    /// Single-row lifetime increments, in call order.
    pub fn single_writes(&self) -> Vec<(String, i64)> {
        self.store.lock().unwrap().single_writes.clone()
    }
}

#[async_trait]
impl ClickRepository for MemoryClickRepository {
    async fn apply_batch(
        &self,
        batch: &ClickBatch,
        day: NaiveDate,
    ) -> Result<BatchOutcome, StoreError> {
        if self.is_hung() {
            return std::future::pending().await;
        }

        let ack_delay = {
            let mut store = self.store.lock().unwrap();
            store.attempts += 1;

            if store.fail_next > 0 {
                store.fail_next -= 1;
                return Err(StoreError::Timeout);
            }

            if !store.applied.insert(batch.id().as_i64()) {
                return Ok(BatchOutcome::AlreadyApplied);
            }

            for (slug, count) in batch.counts() {
                *store.link.entry(slug.clone()).or_default() += count;
                *store.daily.entry((slug.clone(), day)).or_default() += count;
            }
            store.committed.push(batch.counts().clone());

            if store.lose_ack_next > 0 {
                store.lose_ack_next -= 1;
                return Err(StoreError::Timeout);
            }
            store.ack_delay
        };

        if let Some(delay) = ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(BatchOutcome::Applied)
    }

    async fn fence_batch(&self, id: BatchId) -> Result<bool, StoreError> {
        if self.is_hung() {
            return std::future::pending().await;
        }
        let mut store = self.store.lock().unwrap();
        store.fences += 1;
        Ok(store.applied.insert(id.as_i64()))
    }

    async fn increment_link_clicks(&self, slug: &str, count: i64) -> Result<(), StoreError> {
        if self.is_hung() {
            return std::future::pending().await;
        }
        let mut store = self.store.lock().unwrap();
        if store.fail_single_writes {
            return Err(StoreError::Timeout);
        }
        *store.link.entry(slug.to_string()).or_default() += count;
        store.single_writes.push((slug.to_string(), count));
        Ok(())
    }

    async fn increment_daily_clicks(
        &self,
        slug: &str,
        day: NaiveDate,
        count: i64,
    ) -> Result<(), StoreError> {
        if self.is_hung() {
            return std::future::pending().await;
        }
        let mut store = self.store.lock().unwrap();
        if store.fail_single_writes {
            return Err(StoreError::Timeout);
        }
        *store.daily.entry((slug.to_string(), day)).or_default() += count;
        Ok(())
    }
}

/// In-memory links whose stats read from a [`MemoryClickRepository`].
pub struct MemoryLinkRepository {
    links: Mutex<HashMap<String, Link>>,
    clicks: Arc<MemoryClickRepository>,
    collide_next: Mutex<usize>,
    unavailable: Mutex<bool>,
}

impl MemoryLinkRepository {
    pub fn new(clicks: Arc<MemoryClickRepository>) -> Arc<Self> {
        Arc::new(Self {
            links: Mutex::new(HashMap::new()),
            clicks,
            collide_next: Mutex::new(0),
            unavailable: Mutex::new(false),
        })
    }

    pub fn insert(&self, slug: &str, url: &str) -> Link {
        let mut links = self.links.lock().unwrap();
        let link = Link::new(
            links.len() as i64 + 1,
            slug.to_string(),
            url.to_string(),
            now(),
        );
        links.insert(slug.to_string(), link.clone());
        link
    }

    /// The next `n` inserts fail as if the generated slug were taken.
    pub fn collide_next(&self, n: usize) {
        *self.collide_next.lock().unwrap() = n;
    }

    /// Makes every operation fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn len(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.lock().unwrap() {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, StoreError> {
        self.check_available()?;

        {
            let mut collide = self.collide_next.lock().unwrap();
            if *collide > 0 {
                *collide -= 1;
                return Err(StoreError::UniqueViolation {
                    constraint: Some("links_slug_key".to_string()),
                });
            }
        }

        let mut links = self.links.lock().unwrap();
        if links.contains_key(&new_link.slug) {
            return Err(StoreError::UniqueViolation {
                constraint: Some("links_slug_key".to_string()),
            });
        }

        let link = Link::new(
            links.len() as i64 + 1,
            new_link.slug.clone(),
            new_link.url,
            Utc::now(),
        );
        links.insert(new_link.slug, link.clone());
        Ok(link)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Link>, StoreError> {
        self.check_available()?;
        Ok(self.links.lock().unwrap().get(slug).cloned())
    }

    async fn get_stats(&self, slug: &str) -> Result<Option<LinkStats>, StoreError> {
        self.check_available()?;
        let Some(link) = self.links.lock().unwrap().get(slug).cloned() else {
            return Ok(None);
        };

        Ok(Some(LinkStats {
            slug: link.slug,
            url: link.url,
            total: self.clicks.link_clicks(slug),
            daily: self.clicks.daily_rows(slug),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

/// Spawns an aggregator over `clicks` with a fixed clock.
pub fn spawn_aggregator(
    clicks: Arc<MemoryClickRepository>,
    settings: WorkerSettings,
) -> ClickAggregator {
    let clock: Arc<dyn Clock> = fixed_clock();
    let repo: Arc<dyn ClickRepository> = clicks;
    let fallback = FallbackWriter::new(repo.clone(), clock.clone());
    ClickAggregator::spawn(settings, BatchPersister::new(repo, fallback, clock))
}

pub fn settings(batch_size: usize, flush_interval_ms: u64, queue_capacity: usize) -> WorkerSettings {
    WorkerSettings {
        batch_size,
        flush_interval: Duration::from_millis(flush_interval_ms),
        queue_capacity,
    }
}

/// Handler state over in-memory repositories.
pub fn create_test_state(
    links: Arc<MemoryLinkRepository>,
    clicks: Arc<MemoryClickRepository>,
    aggregator: Option<ClickAggregator>,
    base_url: Option<&str>,
) -> AppState {
    let clock: Arc<dyn Clock> = fixed_clock();
    let click_repo: Arc<dyn ClickRepository> = clicks;
    let link_repo: Arc<dyn LinkRepository> = links;

    let fallback = FallbackWriter::new(click_repo, clock.clone());
    let tracker = ClickTracker::new(aggregator, fallback, clock);

    AppState::new(
        Arc::new(LinkService::new(link_repo.clone())),
        Arc::new(StatsService::new(link_repo)),
        tracker,
        base_url.map(str::to_string),
    )
}
