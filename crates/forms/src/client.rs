use formtrack_store::FormStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::config::ClientConfig;
use crate::error::FormsError;
use crate::handler::{StatusHandler, StatusUpdate};
use crate::payload::FormData;
use crate::submission::{self, SubmissionHandle};

/// Per-submission options.
#[derive(Clone, Default)]
pub struct SubmitOpts {
    pub handler: Option<Arc<dyn StatusHandler>>,
    /// Overrides the client's default timeout.
    pub timeout: Option<Duration>,
}

impl SubmitOpts {
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn StatusHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for SubmitOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitOpts")
            .field("handler", &self.handler.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Submits forms for one submitter and tracks them to completion.
#[derive(Clone)]
pub struct FormsClient {
    store: Arc<dyn FormStore>,
    config: Arc<ClientConfig>,
}

impl FormsClient {
    pub fn new(store: Arc<dyn FormStore>, config: ClientConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit a form and start tracking it.
    ///
    /// Returns once the initial record is written and the change
    /// subscription is in place. Status updates arrive on `opts.handler`,
    /// ending with exactly one update marked final.
    pub async fn submit(
        &self,
        form_data: FormData,
        opts: SubmitOpts,
    ) -> Result<SubmissionHandle, FormsError> {
        let timeout = opts
            .timeout
            .unwrap_or_else(|| self.config.default_timeout());
        submission::launch(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            form_data,
            opts.handler,
            timeout,
        )
        .await
    }

    /// Submit a form and wait for its final status.
    ///
    /// Resolves with the enriched payload of the final update, which may be
    /// a failure status or a timeout error; inspect its `@status`.
    pub async fn submit_and_wait(&self, form_data: FormData) -> Result<FormData, FormsError> {
        let (tx, rx) = oneshot::channel();
        let handler: Arc<dyn StatusHandler> = Arc::new(FinalUpdate {
            tx: Mutex::new(Some(tx)),
        });
        let _handle = self
            .submit(form_data, SubmitOpts::default().with_handler(handler))
            .await?;
        rx.await.map_err(|_| FormsError::Abandoned)
    }
}

/// Forwards the payload of the final update to a waiting caller.
struct FinalUpdate {
    tx: Mutex<Option<oneshot::Sender<FormData>>>,
}

impl StatusHandler for FinalUpdate {
    fn on_status(&self, update: StatusUpdate) {
        if !update.is_final {
            return;
        }
        if let Ok(mut slot) = self.tx.lock()
            && let Some(tx) = slot.take()
        {
            let _ = tx.send(update.data);
        }
    }
}
