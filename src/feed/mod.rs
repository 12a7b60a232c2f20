//! Feed retrieval and parsing.
//!
//! - [`parser`] - Converts RSS/Atom/JSON Feed documents using the `feed-rs` crate
//! - [`fetcher`] - HTTP retrieval with a deadline and body size cap
//! - [`model`] - The serialisable feed shapes returned to clients

mod fetcher;
mod model;
mod parser;

pub use fetcher::{FeedFetcher, FetchError};
pub use model::{Feed, FeedCollection, Item};
pub use parser::parse_feed;
