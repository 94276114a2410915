//! Slug generation and validation.

use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;
use std::sync::LazyLock;

/// Length of generated slugs.
pub const SLUG_LENGTH: usize = 7;

/// Slugs accepted on the redirect path: alphanumeric, at most 64 characters.
static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z]{1,64}$").expect("slug pattern is a valid regex")
});

/// Generates a random slug of [`SLUG_LENGTH`] characters from `[0-9A-Za-z]`.
///
/// Collisions are possible; callers insert and retry on a uniqueness
/// violation.
pub fn generate_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns true if `slug` could have been issued by this service.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Builds the public short URL for `slug`.
///
/// `base` is the configured public base URL, or `scheme://host` derived from
/// the request.
pub fn build_short_url(base: &str, slug: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), slug)
}
