//! Run with a database: `DATABASE_URL=... cargo test -- --ignored`

use chrono::NaiveDate;
use click_shortener::domain::click_accumulator::{BatchId, ClickBatch};
use click_shortener::domain::repositories::{BatchOutcome, ClickRepository};
use click_shortener::infrastructure::persistence::PgClickRepository;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
}

fn batch(id: i64, counts: &[(&str, i64)]) -> ClickBatch {
    ClickBatch::with_id(
        BatchId::from_raw(id),
        counts
            .iter()
            .map(|(slug, count)| (slug.to_string(), *count))
            .collect::<HashMap<_, _>>(),
    )
}

async fn link_clicks(pool: &PgPool, slug: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT clicks FROM link_clicks WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .unwrap()
        .unwrap_or(0)
}

async fn daily_clicks(pool: &PgPool, slug: &str, day: NaiveDate) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT clicks FROM daily_clicks WHERE slug = $1 AND day = $2")
        .bind(slug)
        .bind(day)
        .fetch_optional(pool)
        .await
        .unwrap()
        .unwrap_or(0)
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_apply_batch_adds_to_both_tables(pool: PgPool) {
    let repo = PgClickRepository::new(Arc::new(pool.clone()));

    let outcome = repo
        .apply_batch(&batch(1, &[("a", 2), ("b", 1)]), day())
        .await
        .unwrap();
    assert_eq!(outcome, BatchOutcome::Applied);

    repo.apply_batch(&batch(2, &[("a", 3)]), day())
        .await
        .unwrap();

    assert_eq!(link_clicks(&pool, "a").await, 5);
    assert_eq!(link_clicks(&pool, "b").await, 1);
    assert_eq!(daily_clicks(&pool, "a", day()).await, 5);
    assert_eq!(daily_clicks(&pool, "b", day()).await, 1);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_apply_batch_is_idempotent_per_id(pool: PgPool) {
    let repo = PgClickRepository::new(Arc::new(pool.clone()));
    let batch = batch(42, &[("a", 2)]);

    assert_eq!(
        repo.apply_batch(&batch, day()).await.unwrap(),
        BatchOutcome::Applied
    );
    assert_eq!(
        repo.apply_batch(&batch, day()).await.unwrap(),
        BatchOutcome::AlreadyApplied
    );

    assert_eq!(link_clicks(&pool, "a").await, 2);
    assert_eq!(daily_clicks(&pool, "a", day()).await, 2);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_daily_rows_are_keyed_by_day(pool: PgPool) {
    let repo = PgClickRepository::new(Arc::new(pool.clone()));
    let next_day = day().succ_opt().unwrap();

    repo.apply_batch(&batch(1, &[("a", 2)]), day())
        .await
        .unwrap();
    repo.apply_batch(&batch(2, &[("a", 1)]), next_day)
        .await
        .unwrap();

    assert_eq!(link_clicks(&pool, "a").await, 3);
    assert_eq!(daily_clicks(&pool, "a", day()).await, 2);
    assert_eq!(daily_clicks(&pool, "a", next_day).await, 1);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_single_row_increments(pool: PgPool) {
    let repo = PgClickRepository::new(Arc::new(pool.clone()));

    repo.increment_link_clicks("a", 1).await.unwrap();
    repo.increment_link_clicks("a", 4).await.unwrap();
    repo.increment_daily_clicks("a", day(), 5).await.unwrap();

    assert_eq!(link_clicks(&pool, "a").await, 5);
    assert_eq!(daily_clicks(&pool, "a", day()).await, 5);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_fence_reports_committed_batches_and_blocks_later_commits(pool: PgPool) {
    let repo = PgClickRepository::new(Arc::new(pool.clone()));

    repo.apply_batch(&batch(10, &[("a", 2)]), day())
        .await
        .unwrap();
    assert!(!repo.fence_batch(BatchId::from_raw(10)).await.unwrap());

    assert!(repo.fence_batch(BatchId::from_raw(11)).await.unwrap());
    let outcome = repo
        .apply_batch(&batch(11, &[("a", 5)]), day())
        .await
        .unwrap();

    assert_eq!(outcome, BatchOutcome::AlreadyApplied);
    assert_eq!(link_clicks(&pool, "a").await, 2);
}
