use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

use formtrack_store::{ChangeHandler, FeedSubscription, Record, StoreError};

use crate::state::{SharedState, StoreState, Watcher};
use crate::watcher::{WatchParams, run_watch_loop};

/// Shape of the snapshots handed to change handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeDelivery {
    /// Every change delivers the whole record.
    #[default]
    FullRecord,
    /// Every change delivers one snapshot per modified field.
    ChangedFields,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStoreConfig {
    pub delivery: ChangeDelivery,
}

pub struct MemoryStore {
    state: SharedState,
    config: MemoryStoreConfig,
    closed: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
            config,
            closed: AtomicBool::new(false),
        }
    }

    fn check_closed(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Merge `fields` into the record at `key` without notifying watchers.
    ///
    /// Stands in for a backend that coalesced or dropped a change
    /// notification.
    pub async fn put_quiet(
        &self,
        key: &str,
        fields: HashMap<String, Bytes>,
    ) -> Result<(), StoreError> {
        self.check_closed()?;
        self.state.lock().await.merge(key, fields);
        Ok(())
    }

    /// Number of live change feeds registered for `key`.
    pub async fn watcher_count(&self, key: &str) -> usize {
        self.state.lock().await.watcher_count(key)
    }

    /// Keys currently stored under `namespace`.
    pub async fn keys(&self, namespace: &str) -> Vec<String> {
        let prefix = format!("{namespace}/");
        let mut keys: Vec<String> = self
            .state
            .lock()
            .await
            .records
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

#[async_trait]
impl formtrack_store::FormStore for MemoryStore {
    async fn write(&self, key: &str, record: Record) -> Result<(), StoreError> {
        self.check_closed()?;
        let mut state = self.state.lock().await;
        state.replace(key, record, self.config.delivery);
        Ok(())
    }

    async fn update(&self, key: &str, fields: HashMap<String, Bytes>) -> Result<(), StoreError> {
        self.check_closed()?;
        let mut state = self.state.lock().await;
        let (previous, current) = state.merge(key, fields);
        state.notify(key, &previous, &current, self.config.delivery);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.check_closed()?;
        Ok(self.state.lock().await.records.get(key).cloned())
    }

    async fn subscribe(
        &self,
        key: &str,
        handler: Box<dyn ChangeHandler>,
    ) -> Result<Box<dyn formtrack_store::Subscription>, StoreError> {
        self.check_closed()?;

        let (subscription, guard) = FeedSubscription::new();
        let (tx, changes) = mpsc::unbounded_channel();

        self.state
            .lock()
            .await
            .watchers
            .entry(key.to_string())
            .or_default()
            .push(Watcher {
                tx,
                token: guard.token().clone(),
            });

        tokio::spawn(run_watch_loop(WatchParams {
            key: key.to_string(),
            handler,
            changes,
            guard,
            state: Arc::clone(&self.state),
        }));

        Ok(Box::new(subscription))
    }

    fn generate_key(&self, namespace: &str) -> String {
        format!("{namespace}/{}", ulid::Ulid::new())
    }

    #[allow(clippy::cast_possible_truncation)] // millis since epoch fits in u64 until year 584556
    async fn now(&self) -> Result<u64, StoreError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| StoreError::Other(format!("system clock before epoch: {e}")))?;
        Ok(now.as_millis() as u64)
    }

    async fn ping(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
