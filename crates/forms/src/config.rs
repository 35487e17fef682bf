use std::time::Duration;

use crate::ids::SubmitterId;
use crate::labels::StatusLabels;

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Settings captured by a [`FormsClient`](crate::FormsClient) at construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClientConfig {
    pub submitter_id: SubmitterId,
    #[serde(default)]
    pub status_labels: StatusLabels,
    /// How long a submission waits for a final status.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(submitter_id: SubmitterId) -> Self {
        Self {
            submitter_id,
            status_labels: StatusLabels::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_labels(mut self, labels: StatusLabels) -> Self {
        self.status_labels = labels;
        self
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}
