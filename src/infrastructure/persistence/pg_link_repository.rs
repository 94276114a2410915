//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{DailyClicks, Link, LinkStats, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::StoreError;

type LinkRow = (i64, String, String, DateTime<Utc>);

/// PostgreSQL repository for link storage and counter reads.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn into_link((id, slug, url, created_at): LinkRow) -> Link {
    Link::new(id, slug, url, created_at)
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, StoreError> {
        let row: LinkRow = sqlx::query_as(
            r#"
            INSERT INTO links (slug, url)
            VALUES ($1, $2)
            RETURNING id, slug, url, created_at
            "#,
        )
        .bind(&new_link.slug)
        .bind(&new_link.url)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(into_link(row))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Link>, StoreError> {
        let row: Option<LinkRow> =
            sqlx::query_as("SELECT id, slug, url, created_at FROM links WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(row.map(into_link))
    }

    async fn get_stats(&self, slug: &str) -> Result<Option<LinkStats>, StoreError> {
        let link: Option<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT l.slug, l.url, COALESCE(c.clicks, 0)
            FROM links l
            LEFT JOIN link_clicks c ON c.slug = l.slug
            WHERE l.slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool.as_ref())
        .await?;

        let Some((slug, url, total)) = link else {
            return Ok(None);
        };

        let daily: Vec<(NaiveDate, i64)> = sqlx::query_as(
            r#"
            SELECT day, clicks
            FROM daily_clicks
            WHERE slug = $1
            ORDER BY day DESC
            "#,
        )
        .bind(&slug)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(Some(LinkStats {
            slug,
            url,
            total,
            daily: daily
                .into_iter()
                .map(|(day, clicks)| DailyClicks { day, clicks })
                .collect(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
