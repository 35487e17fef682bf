//! Integration tests for the Redis record store backend.
//!
//! Requires a running Redis instance. Set REDIS_URL to enable these tests.
//! Default: redis://127.0.0.1:6379
//!
//! Run with: REDIS_URL=redis://localhost:6379 cargo test --package formtrack-store-redis

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use formtrack_store::{ChangeHandler, FormStore, Record, Snapshot, StoreError};
use formtrack_store_redis::{RedisFormStore, RedisStoreConfig};

fn redis_url() -> Option<String> {
    std::env::var("REDIS_URL").ok()
}

async fn connect() -> RedisFormStore {
    let url = redis_url().expect("REDIS_URL must be set for integration tests");
    RedisFormStore::connect(RedisStoreConfig {
        url,
        configure_notifications: true,
    })
    .await
    .expect("failed to connect to Redis")
}

fn test_namespace(name: &str) -> String {
    format!("formtrack-test/{name}")
}

async fn cleanup_keys(keys: &[&str]) {
    let url = redis_url().unwrap();
    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    for key in keys {
        let _: Result<(), _> = redis::cmd("DEL").arg(*key).query_async(&mut conn).await;
    }
}

fn status_fields(status: &str) -> HashMap<String, Bytes> {
    let mut fields = HashMap::new();
    fields.insert("@status".to_string(), Bytes::from(status.to_string()));
    fields
}

struct CollectingHandler {
    snapshots: Arc<tokio::sync::Mutex<Vec<Snapshot>>>,
    notify: Arc<Notify>,
}

#[async_trait]
impl ChangeHandler for CollectingHandler {
    async fn on_change(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        self.snapshots.lock().await.push(snapshot);
        self.notify.notify_one();
        Ok(())
    }
}

// --- Tests ---

#[tokio::test]
async fn test_ping() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    assert!(store.ping().await.unwrap());
}

#[tokio::test]
async fn test_write_read_roundtrip() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    let key = store.generate_key(&test_namespace("roundtrip"));

    let record = Record::new()
        .with_field("@status", "submit")
        .with_field("formData", r#"{"name":"x"}"#);
    store.write(&key, record).await.unwrap();

    let got = store.read(&key).await.unwrap().expect("expected record");
    assert_eq!(got.get_str("@status"), Some("submit"));
    assert_eq!(got.get_str("formData"), Some(r#"{"name":"x"}"#));

    cleanup_keys(&[&key]).await;
}

#[tokio::test]
async fn test_write_replaces_existing_fields() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    let key = store.generate_key(&test_namespace("replace"));

    store
        .write(&key, Record::new().with_field("a", "1").with_field("b", "2"))
        .await
        .unwrap();
    store
        .write(&key, Record::new().with_field("a", "3"))
        .await
        .unwrap();

    let got = store.read(&key).await.unwrap().unwrap();
    assert_eq!(got.get_str("a"), Some("3"));
    assert!(got.get("b").is_none());

    cleanup_keys(&[&key]).await;
}

#[tokio::test]
async fn test_read_missing_key() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    let key = store.generate_key(&test_namespace("missing"));
    assert!(store.read(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_merges() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    let key = store.generate_key(&test_namespace("update"));

    store
        .write(
            &key,
            Record::new()
                .with_field("@status", "delay")
                .with_field("formData", "{}"),
        )
        .await
        .unwrap();
    store.update(&key, status_fields("cancel")).await.unwrap();

    let got = store.read(&key).await.unwrap().unwrap();
    assert_eq!(got.get_str("@status"), Some("cancel"));
    assert_eq!(got.get_str("formData"), Some("{}"));

    cleanup_keys(&[&key]).await;
}

#[tokio::test]
async fn test_now_uses_server_clock() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    let now = store.now().await.unwrap();
    assert!(now > 1_577_836_800_000);
}

#[tokio::test]
async fn test_subscribe_sees_updates() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    let key = store.generate_key(&test_namespace("subscribe"));
    store
        .write(&key, Record::new().with_field("@status", "submit"))
        .await
        .unwrap();

    let snapshots = Arc::new(tokio::sync::Mutex::new(vec![]));
    let notify = Arc::new(Notify::new());
    let sub = store
        .subscribe(
            &key,
            Box::new(CollectingHandler {
                snapshots: snapshots.clone(),
                notify: notify.clone(),
            }),
        )
        .await
        .unwrap();

    store.update(&key, status_fields("finished")).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if !snapshots.lock().await.is_empty() {
                break;
            }
            notify.notified().await;
        }
    })
    .await
    .expect("timed out waiting for keyspace notification");

    let received = snapshots.lock().await;
    assert_eq!(received[0].key(), key);
    assert_eq!(received[0].current_value().get_str("@status"), Some("finished"));
    assert!(received[0].changed_field().is_none());

    sub.unsubscribe().await.unwrap();
    sub.unsubscribe().await.unwrap();
    assert!(!sub.is_active());

    cleanup_keys(&[&key]).await;
}

#[tokio::test]
async fn test_close_prevents_operations() {
    if redis_url().is_none() {
        return;
    }
    let store = connect().await;
    store.close().await.unwrap();

    let result = store.read("formtrack-test/closed").await;
    assert!(matches!(result, Err(StoreError::Closed)));
}
