use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Failures surfaced by a [`SubscriptionStore`].
///
/// `Unreachable` means no connection could be obtained at all; the other two
/// variants mean a connection was available but the statement did not succeed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be contacted (cluster down, pool closed, connect timeout)
    #[error("Cannot connect to subscription store: {0}")]
    Unreachable(String),

    /// A read failed or row iteration errored
    #[error("Error fetching data from subscription store: {0}")]
    QueryFailed(String),

    /// An insert or delete failed
    #[error("Error writing to subscription store: {0}")]
    WriteFailed(String),
}

impl StoreError {
    pub(crate) fn query(err: impl std::fmt::Display) -> Self {
        StoreError::QueryFailed(err.to_string())
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        StoreError::WriteFailed(err.to_string())
    }
}

// ============================================================================
// Store Contract
// ============================================================================

/// Value stored in the `value` column of every subscription row.
///
/// Only the existence of the (user, url) cell matters.
pub const PRESENCE_MARKER: &str = "1";

/// Per-user set of subscribed feed URLs.
///
/// Rows are laid out wide-column style: the user identifier is the partition
/// key, each feed URL is a clustering column. Writes are upserts and deletes
/// are unconditional, so repeating either operation is harmless.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Short backend name used in log fields.
    fn backend(&self) -> &'static str;

    /// All feed URLs in the user's partition, in clustering (ascending) order.
    async fn list_feed_urls(&self, user: &str) -> Result<Vec<String>, StoreError>;

    /// Subscribe `user` to `url`. Re-subscribing overwrites the existing row.
    async fn add_subscription(&self, user: &str, url: &str) -> Result<(), StoreError>;

    /// Drop the subscription. Succeeds whether or not the row exists.
    async fn remove_subscription(&self, user: &str, url: &str) -> Result<(), StoreError>;
}

/// Quote a keyspace/table name so mixed-case names survive CQL and SQLite.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
