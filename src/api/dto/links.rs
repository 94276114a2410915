//! DTOs for link creation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a short link.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// The original URL to shorten (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
}

/// Created short link.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLinkResponse {
    pub id: i64,
    pub slug: String,
    pub short_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let ok = CreateLinkRequest {
            url: "https://example.com/page".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateLinkRequest {
            url: "not a url".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
