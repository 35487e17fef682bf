use async_trait::async_trait;
use bytes::Bytes;
use formtrack_store::{ChangeHandler, FormStore, Record, Snapshot, StoreError, Subscription};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{classify, enrich};
use crate::config::ClientConfig;
use crate::error::FormsError;
use crate::handler::{StatusHandler, StatusUpdate};
use crate::keys::{fields, submitter_namespace};
use crate::payload::FormData;
use crate::status::FormStatus;

/// `@messages` of the error delivered when no final status arrives in time.
pub const TIMEOUT_MESSAGE: &str = "timeout waiting for last status update";

/// Shared state of one in-flight submission.
///
/// Three paths can end a submission: a terminal status from the change
/// feed, the timeout task, and (for the subscription only) an explicit
/// unsubscribe. `finalized` is swapped at the start of the first two so
/// exactly one of them delivers the final update.
struct Submission {
    key: String,
    form_data: FormData,
    submitted_at: u64,
    config: Arc<ClientConfig>,
    store: Arc<dyn FormStore>,
    handler: Option<Arc<dyn StatusHandler>>,
    finalized: AtomicBool,
    /// Set once the final update has been handed to the handler.
    completed: AtomicBool,
    current: Mutex<FormStatus>,
    /// Held while invoking the handler; no update may follow the final one.
    delivery: Mutex<()>,
    subscription: Mutex<Option<Box<dyn Subscription>>>,
    timer: CancellationToken,
}

/// Write the initial record, subscribe to its changes, and arm the timeout.
pub(crate) async fn launch(
    store: Arc<dyn FormStore>,
    config: Arc<ClientConfig>,
    form_data: FormData,
    handler: Option<Arc<dyn StatusHandler>>,
    timeout: Duration,
) -> Result<SubmissionHandle, FormsError> {
    let namespace = submitter_namespace(config.submitter_id.as_str());
    let key = store.generate_key(&namespace);
    let submitted_at = store.now().await?;

    let record = Record::new()
        .with_field(
            fields::STATUS,
            config.status_labels.label(FormStatus::Submit).to_string(),
        )
        .with_field(fields::FORM_DATA, serde_json::to_vec(&form_data)?)
        .with_field(fields::SUBMITTED_AT, submitted_at.to_string());
    store.write(&key, record).await?;

    info!(key = %key, action = ?form_data.action_type(), "form submitted");

    let submission = Arc::new(Submission {
        key: key.clone(),
        form_data,
        submitted_at,
        config,
        store: Arc::clone(&store),
        handler,
        finalized: AtomicBool::new(false),
        completed: AtomicBool::new(false),
        current: Mutex::new(FormStatus::Submit),
        delivery: Mutex::new(()),
        subscription: Mutex::new(None),
        timer: CancellationToken::new(),
    });

    let watch = StatusWatch {
        submission: Arc::clone(&submission),
    };
    let subscription = store.subscribe(&key, Box::new(watch)).await?;
    submission.attach(subscription).await;
    submission.arm_timeout(timeout);

    Ok(SubmissionHandle { inner: submission })
}

impl Submission {
    async fn on_change(&self, snapshot: Snapshot) {
        if let Some(field) = snapshot.changed_field()
            && field != fields::STATUS
        {
            return;
        }
        let Some(label) = snapshot.current_value().get_str(fields::STATUS) else {
            debug!(key = %self.key, "change without status field");
            return;
        };
        let Some(status) = self.config.status_labels.canonical(label) else {
            warn!(key = %self.key, label, "ignoring unknown status label");
            return;
        };

        if classify(status).terminal {
            self.finish(status).await;
        } else {
            self.progress(status).await;
        }
    }

    async fn progress(&self, status: FormStatus) {
        let _delivery = self.delivery.lock().await;
        if self.finalized.load(Ordering::Acquire) {
            debug!(key = %self.key, %status, "status after finalization ignored");
            return;
        }
        {
            let mut current = self.current.lock().await;
            // The timeout path claims finalization without the delivery lock.
            if self.finalized.load(Ordering::Acquire) || *current == status {
                return;
            }
            *current = status;
        }
        self.deliver(status, None, false);
    }

    async fn finish(&self, status: FormStatus) {
        if self.finalized.swap(true, Ordering::AcqRel) {
            debug!(key = %self.key, %status, "already finalized");
            return;
        }
        self.timer.cancel();
        *self.current.lock().await = status;

        let messages = match enrich(self.store.as_ref(), &self.key, status).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(key = %self.key, %status, error = %e, "failed to read status messages");
                None
            }
        };

        self.release_subscription().await;
        let _delivery = self.delivery.lock().await;
        self.deliver(status, messages, true);
    }

    async fn on_timeout(&self) {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(key = %self.key, "timed out waiting for final status");
        self.release_subscription().await;

        let stored = match self.store.read(&self.key).await {
            Ok(Some(record)) => record
                .get_str(fields::STATUS)
                .and_then(|label| self.config.status_labels.canonical(label))
                .filter(|status| status.is_terminal())
                .map(|status| (status, record.get_json(fields::MESSAGES))),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read record after timeout");
                None
            }
        };
        let (status, messages) = stored.unwrap_or_else(|| {
            (
                FormStatus::Error,
                Some(Value::String(TIMEOUT_MESSAGE.to_string())),
            )
        });

        *self.current.lock().await = status;
        let _delivery = self.delivery.lock().await;
        self.deliver(status, messages, true);
    }

    fn arm_timeout(self: &Arc<Self>, timeout: Duration) {
        let submission = Arc::clone(self);
        let token = self.timer.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(timeout) => submission.on_timeout().await,
            }
        });
    }

    /// Store the subscription, or release it right away if a final status
    /// already arrived while `subscribe` was in flight.
    async fn attach(&self, subscription: Box<dyn Subscription>) {
        let mut slot = self.subscription.lock().await;
        if self.finalized.load(Ordering::Acquire) {
            drop(slot);
            if let Err(e) = subscription.unsubscribe().await {
                warn!(key = %self.key, error = %e, "failed to release subscription");
            }
            return;
        }
        *slot = Some(subscription);
    }

    async fn release_subscription(&self) {
        let taken = self.subscription.lock().await.take();
        if let Some(subscription) = taken
            && let Err(e) = subscription.unsubscribe().await
        {
            warn!(key = %self.key, error = %e, "failed to release subscription");
        }
    }

    /// Caller holds the delivery lock.
    fn deliver(&self, status: FormStatus, messages: Option<Value>, is_final: bool) {
        let label = self.config.status_labels.label(status).to_string();
        if is_final {
            info!(key = %self.key, %status, is_final, "form finalized");
        } else {
            debug!(key = %self.key, %status, is_final, "status update");
        }

        if is_final {
            self.completed.store(true, Ordering::Release);
        }
        let Some(handler) = &self.handler else {
            return;
        };
        let data = self.form_data.enriched(self.submitted_at, &label, messages);
        handler.on_status(StatusUpdate {
            status,
            label,
            data,
            is_final,
        });
    }
}

/// Feeds store changes for the record into its submission.
struct StatusWatch {
    submission: Arc<Submission>,
}

#[async_trait]
impl ChangeHandler for StatusWatch {
    async fn on_change(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        self.submission.on_change(snapshot).await;
        Ok(())
    }
}

/// Caller's handle on a submitted form.
///
/// Dropping the handle does not stop tracking; the submission runs until a
/// final status or its timeout.
pub struct SubmissionHandle {
    inner: Arc<Submission>,
}

impl SubmissionHandle {
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Unix millis recorded as `submittedAt`.
    pub fn submitted_at(&self) -> u64 {
        self.inner.submitted_at
    }

    /// True once the final update has been delivered. A final status that
    /// is still being enriched does not count yet.
    pub fn is_final(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Last observed canonical status.
    pub async fn status(&self) -> FormStatus {
        *self.inner.current.lock().await
    }

    /// Ask the worker to cancel a deferred form.
    ///
    /// Only forms submitted with a `@delay` marker whose last observed
    /// status is `delay` can be cancelled. Returns whether a cancel request
    /// was written; the outcome arrives as a later status update.
    pub async fn cancel(&self) -> Result<bool, FormsError> {
        let inner = &self.inner;
        if !inner.form_data.has_delay() {
            debug!(key = %inner.key, "cancel ignored, form has no delay");
            return Ok(false);
        }
        let status = *inner.current.lock().await;
        if status != FormStatus::Delay || inner.finalized.load(Ordering::Acquire) {
            debug!(key = %inner.key, %status, "cancel ignored, form is not delayed");
            return Ok(false);
        }

        let label = inner.config.status_labels.label(FormStatus::Cancel);
        let mut changes = HashMap::new();
        changes.insert(fields::STATUS.to_string(), Bytes::from(label.to_string()));
        inner.store.update(&inner.key, changes).await?;

        info!(key = %inner.key, "cancel requested");
        Ok(true)
    }

    /// Stop receiving status changes. Safe to call more than once. The
    /// timeout stays armed.
    pub async fn unsubscribe(&self) {
        self.inner.release_subscription().await;
    }
}

impl std::fmt::Debug for SubmissionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionHandle")
            .field("key", &self.inner.key)
            .field("submitted_at", &self.inner.submitted_at)
            .field("is_final", &self.is_final())
            .finish_non_exhaustive()
    }
}
