use async_trait::async_trait;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::Consistency;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::types::{quote_identifier, StoreError, SubscriptionStore, PRESENCE_MARKER};
use crate::config::StoreConfig;

/// Subscription store backed by a Cassandra (or Scylla) cluster.
///
/// The session is opened on first use and then shared by every request; the
/// driver pools connections per node underneath it. A failed connect is not
/// cached, so the next request tries again.
///
/// Every statement runs under the session's default execution profile, which
/// pins consistency to `QUORUM`.
pub struct CassandraStore {
    nodes: Vec<String>,
    keyspace: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    session: OnceCell<Session>,
    select_cql: String,
    insert_cql: String,
    delete_cql: String,
}

impl CassandraStore {
    /// Consistency level applied to all reads and writes.
    pub const CONSISTENCY: Consistency = Consistency::Quorum;

    /// Build a store for the configured cluster. Does not touch the network.
    pub fn new(config: &StoreConfig) -> Self {
        let table = quote_identifier(&config.table);
        Self {
            nodes: config.nodes.clone(),
            keyspace: config.keyspace.clone(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            session: OnceCell::new(),
            select_cql: format!("SELECT column1 FROM {table} WHERE key = ?"),
            insert_cql: format!("INSERT INTO {table} (key, column1, value) VALUES (?, ?, ?)"),
            delete_cql: format!("DELETE FROM {table} WHERE key = ? AND column1 = ?"),
        }
    }

    /// Whether a session has been established yet.
    pub fn is_connected(&self) -> bool {
        self.session.initialized()
    }

    async fn session(&self) -> Result<&Session, StoreError> {
        self.session.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Session, StoreError> {
        if self.nodes.is_empty() {
            return Err(StoreError::Unreachable(
                "no cluster nodes configured".to_string(),
            ));
        }

        let profile = ExecutionProfile::builder()
            .consistency(Self::CONSISTENCY)
            .request_timeout(Some(self.request_timeout))
            .build();

        let builder = SessionBuilder::new()
            .known_nodes(&self.nodes)
            .connection_timeout(self.connect_timeout)
            .default_execution_profile_handle(profile.into_handle())
            .use_keyspace(&self.keyspace, true);

        let session = tokio::time::timeout(self.connect_timeout, builder.build())
            .await
            .map_err(|_| {
                StoreError::Unreachable(format!(
                    "connect timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        tracing::info!(
            nodes = ?self.nodes,
            keyspace = %self.keyspace,
            "Connected to subscription cluster"
        );
        Ok(session)
    }

    #[cfg(test)]
    fn cql(&self) -> (&str, &str, &str) {
        (&self.select_cql, &self.insert_cql, &self.delete_cql)
    }
}

#[async_trait]
impl SubscriptionStore for CassandraStore {
    fn backend(&self) -> &'static str {
        "cassandra"
    }

    async fn list_feed_urls(&self, user: &str) -> Result<Vec<String>, StoreError> {
        let session = self.session().await?;

        let result = session
            .query_unpaged(self.select_cql.as_str(), (user,))
            .await
            .map_err(StoreError::query)?;
        let rows = result.into_rows_result().map_err(StoreError::query)?;

        let mut urls = Vec::new();
        for row in rows.rows::<(String,)>().map_err(StoreError::query)? {
            let (url,) = row.map_err(StoreError::query)?;
            urls.push(url);
        }
        Ok(urls)
    }

    async fn add_subscription(&self, user: &str, url: &str) -> Result<(), StoreError> {
        let session = self.session().await?;
        session
            .query_unpaged(self.insert_cql.as_str(), (user, url, PRESENCE_MARKER))
            .await
            .map_err(StoreError::write)?;
        Ok(())
    }

    async fn remove_subscription(&self, user: &str, url: &str) -> Result<(), StoreError> {
        let session = self.session().await?;
        session
            .query_unpaged(self.delete_cql.as_str(), (user, url))
            .await
            .map_err(StoreError::write)?;
        Ok(())
    }
}
