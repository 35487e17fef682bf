use futures_util::StreamExt;

use formtrack_store::{ChangeHandler, FeedGuard, Record, Snapshot};

use crate::store::read_hash;

pub(crate) struct WatchParams {
    pub pubsub: redis::aio::PubSub,
    pub conn: redis::aio::ConnectionManager,
    pub key: String,
    pub handler: Box<dyn ChangeHandler>,
    pub guard: FeedGuard,
}

/// Turn keyspace notifications for one key into whole-record snapshots.
///
/// Notifications carry only the command name, so every event re-reads the
/// hash. A transaction touching the key several times yields several
/// events for the same final state; repeats of the last delivered record
/// are dropped.
pub(crate) async fn run_watch_loop(params: WatchParams) {
    let WatchParams {
        pubsub,
        mut conn,
        key,
        handler,
        guard,
    } = params;

    let mut events = std::pin::pin!(pubsub.into_on_message());
    let mut last: Option<Record> = None;

    loop {
        let msg = tokio::select! {
            () = guard.token().cancelled() => break,
            next = events.next() => match next {
                Some(msg) => msg,
                None => {
                    tracing::warn!(key = %key, "keyspace notification stream closed");
                    break;
                }
            },
        };

        let event: String = msg.get_payload().unwrap_or_default();
        tracing::debug!(key = %key, event = %event, "keyspace event");

        let record = match read_hash(&mut conn, &key).await {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read record after change");
                continue;
            }
        };

        if last.as_ref() == Some(&record) {
            continue;
        }
        last = Some(record.clone());

        if guard.is_cancelled() {
            break;
        }

        if let Err(e) = handler.on_change(Snapshot::full(key.clone(), record)).await {
            tracing::warn!(key = %key, error = %e, "change handler error");
        }
    }

    tracing::debug!(key = %key, "watch loop stopped");
}
