pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod ids;
pub mod keys;
pub mod labels;
pub mod payload;
pub mod status;
pub mod submission;

pub use classify::{Classification, classify, enrich};
pub use client::{FormsClient, SubmitOpts};
pub use config::ClientConfig;
pub use error::FormsError;
pub use handler::{StatusHandler, StatusUpdate};
pub use ids::SubmitterId;
pub use labels::StatusLabels;
pub use payload::{ActionType, FormData};
pub use status::FormStatus;
pub use submission::{SubmissionHandle, TIMEOUT_MESSAGE};
