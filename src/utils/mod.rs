//! Helpers shared by the service and HTTP layers.
//!
//! - [`slug`] - Slug generation and validation
//! - [`target_url`] - Validation of URLs submitted for shortening

pub mod slug;
pub mod target_url;
