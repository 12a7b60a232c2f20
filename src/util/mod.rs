//! Utility functions shared by the request layer.

mod url_validator;

pub use url_validator::{validate_feed_url, UrlValidationError};
