//! PostgreSQL implementation of the click counter repository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::sync::Arc;
use tracing::debug;

use crate::domain::click_accumulator::{BatchId, ClickBatch};
use crate::domain::repositories::{BatchOutcome, ClickRepository};
use crate::error::StoreError;

/// Largest number of distinct slugs written by one batch transaction.
///
/// The daily upsert binds three parameters per row and PostgreSQL accepts at
/// most 65535 per statement.
pub const MAX_BATCH_SLUGS: usize = 20_000;

/// PostgreSQL repository for additive click counters.
///
/// Batches are written as two multi-row `INSERT .. ON CONFLICT DO UPDATE`
/// statements that add the new count to the existing one.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn write_batch(
        tx: &mut Transaction<'_, Postgres>,
        batch: &ClickBatch,
        day: NaiveDate,
    ) -> Result<BatchOutcome, StoreError> {
        let claimed = sqlx::query(
            "INSERT INTO click_batches (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
        )
        .bind(batch.id().as_i64())
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            return Ok(BatchOutcome::AlreadyApplied);
        }

        let mut links = QueryBuilder::<Postgres>::new("INSERT INTO link_clicks (slug, clicks) ");
        links.push_values(batch.counts(), |mut row, (slug, count)| {
            row.push_bind(slug.clone()).push_bind(*count);
        });
        links.push(" ON CONFLICT (slug) DO UPDATE SET clicks = link_clicks.clicks + EXCLUDED.clicks");
        links.build().execute(&mut **tx).await?;

        let mut daily =
            QueryBuilder::<Postgres>::new("INSERT INTO daily_clicks (slug, day, clicks) ");
        daily.push_values(batch.counts(), |mut row, (slug, count)| {
            row.push_bind(slug.clone()).push_bind(day).push_bind(*count);
        });
        daily.push(
            " ON CONFLICT (slug, day) DO UPDATE SET clicks = daily_clicks.clicks + EXCLUDED.clicks",
        );
        daily.build().execute(&mut **tx).await?;

        Ok(BatchOutcome::Applied)
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn apply_batch(
        &self,
        batch: &ClickBatch,
        day: NaiveDate,
    ) -> Result<BatchOutcome, StoreError> {
        if batch.is_empty() {
            return Ok(BatchOutcome::Applied);
        }

        let mut tx = self.pool.begin().await?;

        match Self::write_batch(&mut tx, batch, day).await {
            Ok(BatchOutcome::Applied) => {
                tx.commit().await?;
                Ok(BatchOutcome::Applied)
            }
            Ok(BatchOutcome::AlreadyApplied) => {
                tx.rollback().await?;
                debug!(batch_id = %batch.id(), "Click batch already committed");
                Ok(BatchOutcome::AlreadyApplied)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    debug!(error = %rollback, "Rollback of failed click batch failed");
                }
                Err(e)
            }
        }
    }

    /// Waits on the row lock of an uncommitted transaction holding the same
    /// id, so the answer reflects whether that transaction committed.
    async fn fence_batch(&self, id: BatchId) -> Result<bool, StoreError> {
        let recorded = sqlx::query(
            "INSERT INTO click_batches (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id.as_i64())
        .execute(self.pool.as_ref())
        .await?
        .rows_affected();

        Ok(recorded == 1)
    }

    async fn increment_link_clicks(&self, slug: &str, count: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO link_clicks (slug, clicks)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET clicks = link_clicks.clicks + EXCLUDED.clicks
            "#,
        )
        .bind(slug)
        .bind(count)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn increment_daily_clicks(
        &self,
        slug: &str,
        day: NaiveDate,
        count: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO daily_clicks (slug, day, clicks)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug, day) DO UPDATE SET clicks = daily_clicks.clicks + EXCLUDED.clicks
            "#,
        )
        .bind(slug)
        .bind(day)
        .bind(count)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
