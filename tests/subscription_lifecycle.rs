//! Integration tests for the subscription lifecycle: subscribe, list, unsubscribe.
//!
//! Each test creates its own in-memory SQLite store for isolation. The sqlite
//! backend keeps the wide-column row layout, so these tests pin the contract
//! every `SubscriptionStore` backend has to honour.

use pretty_assertions::assert_eq;
use rss_middletier::config::{StoreBackend, StoreConfig};
use rss_middletier::storage::{open_store, SqliteStore, StoreError, SubscriptionStore};

async fn test_store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
}

// ============================================================================
// Subscribe
// ============================================================================

#[tokio::test]
async fn test_subscribe_appears_in_list() {
    let store = test_store().await;

    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();

    let urls = store.list_feed_urls("alice").await.unwrap();
    assert_eq!(urls, vec!["http://a.example/rss"]);
}

#[tokio::test]
async fn test_subscribe_twice_keeps_one_row() {
    let store = test_store().await;

    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();

    let urls = store.list_feed_urls("alice").await.unwrap();
    assert_eq!(urls.len(), 1);
}

#[tokio::test]
async fn test_two_subscriptions_listed_in_order() {
    let store = test_store().await;

    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store
        .add_subscription("alice", "http://b.example/rss")
        .await
        .unwrap();

    let urls = store.list_feed_urls("alice").await.unwrap();
    assert_eq!(urls, vec!["http://a.example/rss", "http://b.example/rss"]);
}

// ============================================================================
// Unsubscribe
// ============================================================================

#[tokio::test]
async fn test_unsubscribe_removes_only_that_url() {
    let store = test_store().await;
    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store
        .add_subscription("alice", "http://b.example/rss")
        .await
        .unwrap();

    store
        .remove_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();

    let urls = store.list_feed_urls("alice").await.unwrap();
    assert_eq!(urls, vec!["http://b.example/rss"]);
}

#[tokio::test]
async fn test_unsubscribe_missing_url_succeeds() {
    let store = test_store().await;

    store
        .remove_subscription("alice", "http://never.example/rss")
        .await
        .unwrap();

    assert!(store.list_feed_urls("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_does_not_touch_other_users() {
    let store = test_store().await;
    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store
        .add_subscription("bob", "http://a.example/rss")
        .await
        .unwrap();

    store
        .remove_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();

    assert!(store.list_feed_urls("alice").await.unwrap().is_empty());
    assert_eq!(
        store.list_feed_urls("bob").await.unwrap(),
        vec!["http://a.example/rss"]
    );
}

#[tokio::test]
async fn test_resubscribe_after_unsubscribe() {
    let store = test_store().await;
    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store
        .remove_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();

    assert_eq!(
        store.list_feed_urls("alice").await.unwrap(),
        vec!["http://a.example/rss"]
    );
}

// ============================================================================
// Store availability
// ============================================================================

#[tokio::test]
async fn test_closed_store_fails_every_operation_without_writing() {
    let store = test_store().await;
    store
        .add_subscription("alice", "http://a.example/rss")
        .await
        .unwrap();
    store.close().await;

    assert!(matches!(
        store.list_feed_urls("alice").await,
        Err(StoreError::Unreachable(_))
    ));
    assert!(matches!(
        store.add_subscription("alice", "http://b.example/rss").await,
        Err(StoreError::Unreachable(_))
    ));
    assert!(matches!(
        store.remove_subscription("alice", "http://a.example/rss").await,
        Err(StoreError::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_file_backed_store_persists_across_reopen() {
    let dir = std::env::temp_dir().join("rss_middletier_reopen_test");
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("subscriptions.db");
    std::fs::remove_file(&db_path).ok();

    let config = StoreConfig {
        backend: StoreBackend::Sqlite,
        sqlite_path: db_path.to_str().unwrap().to_string(),
        ..StoreConfig::default()
    };

    {
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "sqlite");
        store
            .add_subscription("alice", "http://a.example/rss")
            .await
            .unwrap();
    }

    let reopened = open_store(&config).await.unwrap();
    assert_eq!(
        reopened.list_feed_urls("alice").await.unwrap(),
        vec!["http://a.example/rss"]
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_cassandra_backend_opens_without_network() {
    let config = StoreConfig {
        backend: StoreBackend::Cassandra,
        nodes: vec!["127.0.0.1:1".to_string()],
        connect_timeout_secs: 2,
        ..StoreConfig::default()
    };

    let store = open_store(&config).await.unwrap();
    assert_eq!(store.backend(), "cassandra");
    assert!(matches!(
        store.list_feed_urls("alice").await,
        Err(StoreError::Unreachable(_))
    ));
}
