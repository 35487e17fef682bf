use tokio::sync::mpsc;

use formtrack_store::{ChangeHandler, FeedGuard, Snapshot};

use crate::state::SharedState;

pub(crate) struct WatchParams {
    pub key: String,
    pub handler: Box<dyn ChangeHandler>,
    pub changes: mpsc::UnboundedReceiver<Snapshot>,
    pub guard: FeedGuard,
    pub state: SharedState,
}

/// Feed snapshots to the handler one at a time until cancelled.
pub(crate) async fn run_watch_loop(params: WatchParams) {
    let WatchParams {
        key,
        handler,
        mut changes,
        guard,
        state,
    } = params;

    loop {
        let snapshot = tokio::select! {
            () = guard.token().cancelled() => break,
            next = changes.recv() => match next {
                Some(snapshot) => snapshot,
                None => break,
            },
        };

        // The handler may have unsubscribed while handling the previous snapshot.
        if guard.is_cancelled() {
            break;
        }

        if let Err(e) = handler.on_change(snapshot).await {
            tracing::warn!(key = %key, error = %e, "change handler error");
        }
    }

    drop(changes);
    state.lock().await.prune(&key);
    tracing::debug!(key = %key, "watch loop stopped");
}
