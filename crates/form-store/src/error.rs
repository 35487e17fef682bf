use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("store is closed")]
    Closed,

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("{0}")]
    Other(String),
}
