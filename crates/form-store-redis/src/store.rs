use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use formtrack_store::{ChangeHandler, FeedSubscription, Record, StoreError};

use crate::config::RedisStoreConfig;
use crate::error::{map_redis_err, map_subscribe_err};
use crate::watcher::{WatchParams, run_watch_loop};

/// Records live in Redis hashes; change feeds ride on keyspace notifications.
pub struct RedisFormStore {
    client: redis::Client,
    conn: redis::aio::ConnectionManager,
    db: i64,
    closed: AtomicBool,
}

impl RedisFormStore {
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let db = client.get_connection_info().redis.db;
        let mut conn = redis::aio::ConnectionManager::new(client.clone())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if config.configure_notifications {
            redis::cmd("CONFIG")
                .arg("SET")
                .arg("notify-keyspace-events")
                .arg("KEA")
                .query_async::<()>(&mut conn)
                .await
                .map_err(map_redis_err)?;
        }

        tracing::debug!(url = %config.url, db, "connected to redis");

        Ok(Self {
            client,
            conn,
            db,
            closed: AtomicBool::new(false),
        })
    }

    fn check_closed(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

/// `HGETALL` into a record; an empty hash means the key does not exist.
pub(crate) async fn read_hash(
    conn: &mut redis::aio::ConnectionManager,
    key: &str,
) -> Result<Option<Record>, StoreError> {
    let fields: HashMap<String, Vec<u8>> = redis::cmd("HGETALL")
        .arg(key)
        .query_async(conn)
        .await
        .map_err(map_redis_err)?;

    if fields.is_empty() {
        return Ok(None);
    }

    let fields = fields
        .into_iter()
        .map(|(k, v)| (k, Bytes::from(v)))
        .collect::<HashMap<_, _>>();

    Ok(Some(Record::from(fields)))
}

#[async_trait]
impl formtrack_store::FormStore for RedisFormStore {
    async fn write(&self, key: &str, record: Record) -> Result<(), StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(key).ignore();

        if !record.fields.is_empty() {
            let pairs: Vec<(&str, &[u8])> = record
                .fields
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_ref()))
                .collect();
            pipe.cmd("HSET").arg(key).arg(&pairs).ignore();
        }

        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn update(&self, key: &str, fields: HashMap<String, Bytes>) -> Result<(), StoreError> {
        self.check_closed()?;
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let pairs: Vec<(&str, &[u8])> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect();

        redis::cmd("HSET")
            .arg(key)
            .arg(&pairs)
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)?;

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        read_hash(&mut conn, key).await
    }

    async fn subscribe(
        &self,
        key: &str,
        handler: Box<dyn ChangeHandler>,
    ) -> Result<Box<dyn formtrack_store::Subscription>, StoreError> {
        self.check_closed()?;

        let channel = format!("__keyspace@{}__:{key}", self.db);
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(map_subscribe_err)?;
        pubsub
            .subscribe(&channel)
            .await
            .map_err(map_subscribe_err)?;

        let (subscription, guard) = FeedSubscription::new();

        tokio::spawn(run_watch_loop(WatchParams {
            pubsub,
            conn: self.conn.clone(),
            key: key.to_string(),
            handler,
            guard,
        }));

        Ok(Box::new(subscription))
    }

    fn generate_key(&self, namespace: &str) -> String {
        format!("{namespace}/{}", ulid::Ulid::new())
    }

    /// Server clock, from `TIME`.
    async fn now(&self) -> Result<u64, StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        let (secs, micros): (u64, u64) = redis::cmd("TIME")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(secs * 1000 + micros / 1000)
    }

    async fn ping(&self) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(pong == "PONG")
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
