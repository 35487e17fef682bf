use formtrack_store::StoreError;

/// Errors surfaced to callers of the forms client.
///
/// Lifecycle outcomes (timeouts, validation failures) are not errors; they
/// arrive through the status handler.
#[derive(Debug, thiserror::Error)]
pub enum FormsError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid status labels: {0}")]
    InvalidLabels(String),

    #[error("invalid submitter id: {0}")]
    InvalidSubmitterId(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("submission ended without a final status")]
    Abandoned,
}
