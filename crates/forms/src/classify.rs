use formtrack_store::{FormStore, StoreError};

use crate::keys::fields;
use crate::status::FormStatus;

/// How the orchestrator treats an observed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Ends the lifecycle.
    pub terminal: bool,
    /// Worker diagnostics should be fetched before delivery.
    pub needs_messages: bool,
}

pub fn classify(status: FormStatus) -> Classification {
    Classification {
        terminal: status.is_terminal(),
        needs_messages: status.carries_messages(),
    }
}

/// Fetch the worker's `@messages` for a failure status.
///
/// Reads the record at most once, and only for statuses that carry
/// messages. Returns `None` when the status carries none, the record is
/// gone, or the field is absent.
pub async fn enrich(
    store: &dyn FormStore,
    key: &str,
    status: FormStatus,
) -> Result<Option<serde_json::Value>, StoreError> {
    if !classify(status).needs_messages {
        return Ok(None);
    }
    let record = store.read(key).await?;
    Ok(record.and_then(|r| r.get_json(fields::MESSAGES)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use formtrack_store::{ChangeHandler, Record, Subscription};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one fixed record and counts reads.
    struct FixedStore {
        record: Option<Record>,
        reads: AtomicUsize,
    }

    impl FixedStore {
        fn new(record: Option<Record>) -> Self {
            Self {
                record,
                reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FormStore for FixedStore {
        async fn write(&self, _key: &str, _record: Record) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update(
            &self,
            _key: &str,
            _fields: HashMap<String, Bytes>,
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn read(&self, _key: &str) -> Result<Option<Record>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.record.clone())
        }
        async fn subscribe(
            &self,
            _key: &str,
            _handler: Box<dyn ChangeHandler>,
        ) -> Result<Box<dyn Subscription>, StoreError> {
            Err(StoreError::Subscribe("not supported".into()))
        }
        fn generate_key(&self, namespace: &str) -> String {
            format!("{namespace}/fixed")
        }
        async fn now(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
        async fn ping(&self) -> Result<bool, StoreError> {
            Ok(true)
        }
        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn classification_table() {
        let expected = [
            (FormStatus::Submit, false, false),
            (FormStatus::Submitted, false, false),
            (FormStatus::Delay, false, false),
            (FormStatus::Cancel, false, false),
            (FormStatus::Cancelled, true, true),
            (FormStatus::Finished, true, false),
            (FormStatus::ValidationError, true, true),
            (FormStatus::SecurityError, true, true),
            (FormStatus::Error, true, true),
        ];
        for (status, terminal, needs_messages) in expected {
            assert_eq!(
                classify(status),
                Classification {
                    terminal,
                    needs_messages
                },
                "{status}"
            );
        }
    }

    #[tokio::test]
    async fn enrich_reads_messages_for_failures() {
        let store = FixedStore::new(Some(
            Record::new()
                .with_field("@status", "validation-error")
                .with_field("@messages", r#"{"name":"Invalid"}"#),
        ));
        let messages = enrich(&store, "forms/u/k", FormStatus::ValidationError)
            .await
            .unwrap();
        assert_eq!(messages, Some(serde_json::json!({"name": "Invalid"})));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn enrich_skips_read_for_success_statuses() {
        let store = FixedStore::new(None);
        for status in [FormStatus::Finished, FormStatus::Submitted, FormStatus::Delay] {
            assert_eq!(enrich(&store, "forms/u/k", status).await.unwrap(), None);
        }
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enrich_without_messages_field() {
        let store = FixedStore::new(Some(Record::new().with_field("@status", "error")));
        assert_eq!(
            enrich(&store, "forms/u/k", FormStatus::Error).await.unwrap(),
            None
        );

        let gone = FixedStore::new(None);
        assert_eq!(
            enrich(&gone, "forms/u/k", FormStatus::Cancelled).await.unwrap(),
            None
        );
    }
}
