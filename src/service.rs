//! Request orchestration: subscription lookups and feed fan-out.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::feed::{Feed, FeedCollection, FeedFetcher};
use crate::storage::{StoreError, SubscriptionStore};

/// Ties the subscription store to the feed fetcher.
///
/// Store failures abort the operation; a feed that cannot be fetched is
/// logged and left out of the result.
pub struct FeedService {
    store: Arc<dyn SubscriptionStore>,
    fetcher: FeedFetcher,
    concurrency: usize,
}

impl FeedService {
    /// `concurrency` bounds how many feeds one request fetches at once;
    /// values below 1 are treated as 1 (strictly sequential).
    pub fn new(store: Arc<dyn SubscriptionStore>, fetcher: FeedFetcher, concurrency: usize) -> Self {
        Self {
            store,
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every feed `user` is subscribed to.
    ///
    /// Feeds come back in the order the store enumerates the subscriptions,
    /// regardless of which fetch finishes first. Feeds that fail to fetch are
    /// dropped without any marker in the result.
    #[tracing::instrument(name = "middletier:FetchFeed", skip_all, fields(user = %user))]
    pub async fn fetch_feeds(&self, user: &str) -> Result<FeedCollection, StoreError> {
        let urls = self.feed_urls(user).await?;
        let total = urls.len();
        let fetcher = &self.fetcher;

        let fetched: Vec<Option<Feed>> = stream::iter(urls)
            .map(|url| async move {
                match fetcher.fetch(&url).await {
                    Ok(feed) => Some(feed.with_source(url)),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Skipping feed that failed to fetch");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let feeds: Vec<Feed> = fetched.into_iter().flatten().collect();
        if feeds.len() < total {
            tracing::info!(
                fetched = feeds.len(),
                skipped = total - feeds.len(),
                "Some subscribed feeds were unavailable"
            );
        }

        Ok(FeedCollection { feeds })
    }

    #[tracing::instrument(name = "middletier:GetUrls", skip_all, fields(backend = self.store.backend()))]
    async fn feed_urls(&self, user: &str) -> Result<Vec<String>, StoreError> {
        let urls = self
            .store
            .list_feed_urls(user)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to list subscriptions"))?;
        tracing::debug!(count = urls.len(), "Listed subscriptions");
        Ok(urls)
    }

    #[tracing::instrument(name = "middletier:Subscribe", skip_all, fields(user = %user, url = %url))]
    pub async fn subscribe(&self, user: &str, url: &str) -> Result<(), StoreError> {
        self.store
            .add_subscription(user, url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to store subscription"))?;
        tracing::info!("Subscribed");
        Ok(())
    }

    #[tracing::instrument(name = "middletier:Unsubscribe", skip_all, fields(user = %user, url = %url))]
    pub async fn unsubscribe(&self, user: &str, url: &str) -> Result<(), StoreError> {
        self.store
            .remove_subscription(user, url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to remove subscription"))?;
        tracing::info!("Unsubscribed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::storage::SqliteStore;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(title: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>{title}</title>
<item><guid>{title}-1</guid><title>Post</title></item>
</channel></rss>"#
        )
    }

    async fn mount_feed(server: &MockServer, route: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(template)
            .mount(server)
            .await;
    }

    async fn service_with(concurrency: usize, timeout_secs: u64) -> (FeedService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let config = FetchConfig {
            timeout_secs,
            ..FetchConfig::default()
        };
        let fetcher = FeedFetcher::new(&config).unwrap();
        let service = FeedService::new(store.clone(), fetcher, concurrency);
        (service, store)
    }

    fn feed_links(collection: &FeedCollection) -> Vec<&str> {
        collection.feeds.iter().map(|f| f.feed_link.as_str()).collect()
    }

    #[tokio::test]
    async fn test_no_subscriptions_yields_empty_collection() {
        let (service, _store) = service_with(4, 5).await;
        let collection = service.fetch_feeds("alice").await.unwrap();
        assert!(collection.feeds.is_empty());
    }

    #[tokio::test]
    async fn test_feeds_returned_in_store_order_and_stamped() {
        let server = MockServer::start().await;
        // The first feed answers last; output order must not change
        mount_feed(
            &server,
            "/a",
            ResponseTemplate::new(200)
                .set_body_string(rss("A"))
                .set_delay(Duration::from_millis(300)),
        )
        .await;
        mount_feed(&server, "/b", ResponseTemplate::new(200).set_body_string(rss("B"))).await;

        let (service, _store) = service_with(4, 5).await;
        let a = format!("{}/a", server.uri());
        let b = format!("{}/b", server.uri());
        service.subscribe("alice", &b).await.unwrap();
        service.subscribe("alice", &a).await.unwrap();

        let collection = service.fetch_feeds("alice").await.unwrap();
        assert_eq!(feed_links(&collection), vec![a.as_str(), b.as_str()]);
        assert_eq!(collection.feeds[0].title, "A");
        assert_eq!(collection.feeds[1].title, "B");
    }

    #[tokio::test]
    async fn test_failed_feeds_are_skipped() {
        let server = MockServer::start().await;
        mount_feed(&server, "/a", ResponseTemplate::new(200).set_body_string(rss("A"))).await;
        mount_feed(&server, "/b", ResponseTemplate::new(500)).await;
        mount_feed(&server, "/c", ResponseTemplate::new(200).set_body_string("garbage")).await;
        mount_feed(&server, "/d", ResponseTemplate::new(200).set_body_string(rss("D"))).await;

        let (service, _store) = service_with(1, 5).await;
        for route in ["/a", "/b", "/c", "/d"] {
            service
                .subscribe("alice", &format!("{}{}", server.uri(), route))
                .await
                .unwrap();
        }

        let collection = service.fetch_feeds("alice").await.unwrap();
        let a = format!("{}/a", server.uri());
        let d = format!("{}/d", server.uri());
        assert_eq!(feed_links(&collection), vec![a.as_str(), d.as_str()]);
    }

    #[tokio::test]
    async fn test_timed_out_feed_is_skipped() {
        let server = MockServer::start().await;
        mount_feed(&server, "/a", ResponseTemplate::new(200).set_body_string(rss("A"))).await;
        mount_feed(
            &server,
            "/b",
            ResponseTemplate::new(200)
                .set_body_string(rss("B"))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let (service, _store) = service_with(2, 1).await;
        let a = format!("{}/a", server.uri());
        service.subscribe("alice", &a).await.unwrap();
        service
            .subscribe("alice", &format!("{}/b", server.uri()))
            .await
            .unwrap();

        let collection = service.fetch_feeds("alice").await.unwrap();
        assert_eq!(feed_links(&collection), vec![a.as_str()]);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_fetch() {
        let (service, store) = service_with(1, 5).await;
        store.close().await;

        let err = service.fetch_feeds("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let (service, store) = service_with(1, 5).await;
        service.subscribe("alice", "http://a.example/rss").await.unwrap();
        service.subscribe("alice", "http://a.example/rss").await.unwrap();

        assert_eq!(
            store.list_feed_urls("alice").await.unwrap(),
            vec!["http://a.example/rss"]
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_succeeds() {
        let (service, _store) = service_with(1, 5).await;
        service
            .unsubscribe("alice", "http://never.example/rss")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_concurrency_clamped() {
        let (service, _store) = service_with(0, 5).await;
        assert_eq!(service.concurrency, 1);
    }
}
