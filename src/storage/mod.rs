//! Subscription persistence.
//!
//! [`SubscriptionStore`] is the contract the request layer depends on;
//! [`CassandraStore`] is the production backend and [`SqliteStore`] keeps the
//! same row layout in a local file for development and tests.

mod cassandra;
mod sqlite;
mod types;

use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};

pub use cassandra::CassandraStore;
pub use sqlite::SqliteStore;
pub use types::{StoreError, SubscriptionStore, PRESENCE_MARKER};

/// Build the store selected by `config.backend`.
///
/// The Cassandra backend connects lazily, so this only fails for sqlite when
/// the database file cannot be opened.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn SubscriptionStore>, StoreError> {
    let store: Arc<dyn SubscriptionStore> = match config.backend {
        StoreBackend::Cassandra => Arc::new(CassandraStore::new(config)),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(config).await?),
    };
    tracing::debug!(backend = store.backend(), "Subscription store ready");
    Ok(store)
}
