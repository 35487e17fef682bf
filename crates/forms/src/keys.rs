//! Record key builders and field name constants for form records.

/// Namespace holding every form of one submitter: `forms/{submitter_id}`
#[must_use]
pub fn submitter_namespace(submitter_id: &str) -> String {
    format!("forms/{submitter_id}")
}

/// Field names of the stored record.
pub mod fields {
    pub const STATUS: &str = "@status";
    pub const FORM_DATA: &str = "formData";
    pub const SUBMITTED_AT: &str = "submittedAt";
    pub const MESSAGES: &str = "@messages";
}

/// Marker keys the client reads from a form payload.
pub mod markers {
    pub const ACTION_TYPE: &str = "@actionType";
    pub const DELAY: &str = "@delay";
}
