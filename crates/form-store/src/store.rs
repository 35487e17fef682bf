use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::record::{Record, Snapshot};

/// Keyed record store. Point writes, point reads, and per-key change feeds.
///
/// Backends are expected to deliver change notifications for a key in the
/// order the changes were applied.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Replace the record at `key`. Returns once the backend has acknowledged it.
    async fn write(&self, key: &str, record: Record) -> Result<(), StoreError>;

    /// Merge `fields` into the record at `key`, creating it if absent.
    async fn update(&self, key: &str, fields: HashMap<String, Bytes>) -> Result<(), StoreError>;

    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Register `handler` for changes to `key`. Only changes applied after
    /// registration are delivered.
    async fn subscribe(
        &self,
        key: &str,
        handler: Box<dyn ChangeHandler>,
    ) -> Result<Box<dyn Subscription>, StoreError>;

    /// Fresh unique key under `namespace`: `{namespace}/{id}`.
    fn generate_key(&self, namespace: &str) -> String;

    /// Current time in unix millis, from the client or the server clock
    /// depending on the backend.
    async fn now(&self) -> Result<u64, StoreError>;

    // Health
    async fn ping(&self) -> Result<bool, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

/// Receives change snapshots for one key, one at a time.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_change(&self, snapshot: Snapshot) -> Result<(), StoreError>;
}

/// Handle returned by subscribe. Unsubscribing twice is a no-op.
#[async_trait]
pub trait Subscription: Send + Sync {
    async fn unsubscribe(&self) -> Result<(), StoreError>;
    fn is_active(&self) -> bool;
}
