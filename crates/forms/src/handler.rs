use crate::payload::FormData;
use crate::status::FormStatus;

/// One observed step of a submission's lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Canonical status.
    pub status: FormStatus,
    /// Label as stored, after translation.
    pub label: String,
    /// Enriched payload: form data plus `submittedAt`, `@status`, and
    /// `@messages` when the worker attached any.
    pub data: FormData,
    pub is_final: bool,
}

/// Receives status updates for a submission.
///
/// Called from the store's feed task or the timeout task; implementations
/// should return quickly. After a call with `is_final` set no further calls
/// are made for that submission.
pub trait StatusHandler: Send + Sync {
    fn on_status(&self, update: StatusUpdate);
}

impl<F> StatusHandler for F
where
    F: Fn(StatusUpdate) + Send + Sync,
{
    fn on_status(&self, update: StatusUpdate) {
        self(update);
    }
}
