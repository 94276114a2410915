//! Link creation and resolution service.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::warn;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::{AppError, StoreError};
use crate::utils::slug::generate_slug;
use crate::utils::target_url::validate_target_url;

/// Attempts at inserting a fresh slug before giving up.
const MAX_SLUG_ATTEMPTS: usize = 5;

/// Pause between slug insert attempts.
const SLUG_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Service for creating short links and resolving slugs.
pub struct LinkService<R: LinkRepository + ?Sized = dyn LinkRepository> {
    repository: Arc<R>,
}

impl<R: LinkRepository + ?Sized> LinkService<R> {
    /// Creates a new link service.
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Creates a short link for `url` under a freshly generated slug.
    ///
    /// A slug collision regenerates the slug and retries, up to five
    /// attempts; any other store error aborts immediately.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is not an absolute
    /// http(s) URL.
    /// Returns [`AppError::Conflict`] if every attempt collided.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn create_link(&self, url: &str) -> Result<Link, AppError> {
        let url = validate_target_url(url).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        let strategy = FixedInterval::new(SLUG_RETRY_DELAY).take(MAX_SLUG_ATTEMPTS - 1);
        let mut attempt = 0usize;

        let link = RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                let current = attempt;
                let new_link = NewLink {
                    slug: generate_slug(),
                    url: url.clone(),
                };
                let repository = Arc::clone(&self.repository);
                async move {
                    repository.create(new_link).await.inspect_err(|e| {
                        if e.is_unique_violation() && current < MAX_SLUG_ATTEMPTS {
                            warn!(attempt = current + 1, "Retrying slug insert after collision");
                        }
                    })
                }
            },
            StoreError::is_unique_violation,
        )
        .await?;

        Ok(link)
    }

    /// Looks up the link behind `slug`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this slug.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn resolve(&self, slug: &str) -> Result<Link, AppError> {
        self.repository
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "slug": slug })))
    }

    /// Checks that the store answers a trivial query.
    pub async fn check_store(&self) -> Result<(), StoreError> {
        self.repository.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use chrono::Utc;

    fn link_from(new_link: NewLink) -> Link {
        Link::new(1, new_link.slug, new_link.url, Utc::now())
    }

    #[tokio::test]
    async fn test_create_link_success() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .withf(|l| l.url == "https://example.com" && l.slug.len() == 7)
            .times(1)
            .returning(|l| Ok(link_from(l)));

        let service = LinkService::new(Arc::new(repo));
        let link = service.create_link("https://example.com").await.unwrap();

        assert_eq!(link.url, "https://example.com");
        assert_eq!(link.slug.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_link_retries_on_collision() {
        let mut repo = MockLinkRepository::new();
        let mut calls = 0;
        repo.expect_create().times(3).returning(move |l| {
            calls += 1;
            if calls < 3 {
                Err(StoreError::UniqueViolation {
                    constraint: Some("links_slug_key".to_string()),
                })
            } else {
                Ok(link_from(l))
            }
        });

        let service = LinkService::new(Arc::new(repo));
        let result = service.create_link("https://example.com").await;

        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_link_gives_up_after_five_collisions() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .times(5)
            .returning(|_| Err(StoreError::UniqueViolation { constraint: None }));

        let service = LinkService::new(Arc::new(repo));
        let result = service.create_link("https://example.com").await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_link_does_not_retry_other_errors() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|_| Err(StoreError::Timeout));

        let service = LinkService::new(Arc::new(repo));
        let result = service.create_link("https://example.com").await;

        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_create_link_rejects_invalid_url() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create().never();

        let service = LinkService::new(Arc::new(repo));
        let result = service.create_link("javascript:alert(1)").await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_resolve_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_slug()
            .withf(|slug| slug == "abc1234")
            .times(1)
            .returning(|slug| {
                Ok(Some(Link::new(
                    7,
                    slug.to_string(),
                    "https://example.com".to_string(),
                    Utc::now(),
                )))
            });

        let service = LinkService::new(Arc::new(repo));
        let link = service.resolve("abc1234").await.unwrap();

        assert_eq!(link.id, 7);
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_slug().times(1).returning(|_| Ok(None));

        let service = LinkService::new(Arc::new(repo));
        let result = service.resolve("missing").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}
