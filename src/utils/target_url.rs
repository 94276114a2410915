//! Validation of URLs submitted for shortening.

use url::Url;

/// Reasons a URL cannot be shortened.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetUrlError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,
}

/// Checks that `input` is an absolute `http`/`https` URL with a host.
///
/// Returns the input with surrounding whitespace removed; the URL is stored
/// as submitted, not normalized.
///
/// # Errors
///
/// See [`TargetUrlError`].
pub fn validate_target_url(input: &str) -> Result<String, TargetUrlError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| TargetUrlError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TargetUrlError::UnsupportedProtocol);
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(TargetUrlError::MissingHost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert_eq!(
            validate_target_url("https://example.com/path?q=1").unwrap(),
            "https://example.com/path?q=1"
        );
        assert!(validate_target_url("http://localhost:3000").is_ok());
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            validate_target_url("  https://example.com  ").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(
            validate_target_url("javascript:alert(1)"),
            Err(TargetUrlError::UnsupportedProtocol)
        );
        assert_eq!(
            validate_target_url("ftp://example.com/file"),
            Err(TargetUrlError::UnsupportedProtocol)
        );
    }

    #[test]
    fn test_rejects_relative_and_garbage() {
        assert!(matches!(
            validate_target_url("example.com"),
            Err(TargetUrlError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_target_url(""),
            Err(TargetUrlError::InvalidFormat(_))
        ));
    }
}
