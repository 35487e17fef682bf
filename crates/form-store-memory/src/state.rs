use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use formtrack_store::{Record, Snapshot};

use crate::store::ChangeDelivery;

pub(crate) type SharedState = Arc<Mutex<StoreState>>;

pub(crate) struct StoreState {
    pub records: HashMap<String, Record>,
    pub watchers: HashMap<String, Vec<Watcher>>,
}

/// One registered change feed for a key.
pub(crate) struct Watcher {
    pub tx: mpsc::UnboundedSender<Snapshot>,
    pub token: CancellationToken,
}

impl Watcher {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            watchers: HashMap::new(),
        }
    }

    /// Replace the record at `key` and notify watchers if anything changed.
    pub fn replace(&mut self, key: &str, record: Record, delivery: ChangeDelivery) {
        let previous = self.records.insert(key.to_string(), record.clone());
        let previous = previous.unwrap_or_default();
        self.notify(key, &previous, &record, delivery);
    }

    /// Merge `fields` into the record at `key`. Returns the previous and the
    /// new record so the caller can decide whether to notify.
    pub fn merge(&mut self, key: &str, fields: HashMap<String, Bytes>) -> (Record, Record) {
        let entry = self.records.entry(key.to_string()).or_default();
        let previous = entry.clone();
        entry.fields.extend(fields);
        (previous, entry.clone())
    }

    pub fn notify(&mut self, key: &str, previous: &Record, current: &Record, delivery: ChangeDelivery) {
        if previous == current {
            return;
        }

        self.prune(key);
        let Some(watchers) = self.watchers.get(key) else {
            return;
        };

        let snapshots = change_snapshots(key, previous, current, delivery);
        for watcher in watchers.iter() {
            for snapshot in &snapshots {
                // A closed receiver is pruned on the next notification.
                let _ = watcher.tx.send(snapshot.clone());
            }
        }
    }

    /// Drop dead watchers for `key`, and the key itself once none remain.
    pub fn prune(&mut self, key: &str) {
        if let Some(watchers) = self.watchers.get_mut(key) {
            watchers.retain(Watcher::is_live);
            if watchers.is_empty() {
                self.watchers.remove(key);
            }
        }
    }

    pub fn watcher_count(&self, key: &str) -> usize {
        self.watchers
            .get(key)
            .map_or(0, |w| w.iter().filter(|w| w.is_live()).count())
    }
}

/// Build the snapshots a change produces under the given delivery mode.
///
/// Changed-field mode emits one snapshot per added or modified field, in
/// field name order. Removed fields produce nothing in that mode.
pub(crate) fn change_snapshots(
    key: &str,
    previous: &Record,
    current: &Record,
    delivery: ChangeDelivery,
) -> Vec<Snapshot> {
    match delivery {
        ChangeDelivery::FullRecord => vec![Snapshot::full(key, current.clone())],
        ChangeDelivery::ChangedFields => {
            let mut changed: Vec<(&String, &Bytes)> = current
                .fields
                .iter()
                .filter(|(field, value)| previous.fields.get(*field) != Some(*value))
                .collect();
            changed.sort_by(|a, b| a.0.cmp(b.0));
            changed
                .into_iter()
                .map(|(field, value)| Snapshot::field(key, field.clone(), value.clone()))
                .collect()
        }
    }
}
