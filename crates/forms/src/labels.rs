use std::collections::{HashMap, HashSet};

use crate::error::FormsError;
use crate::status::FormStatus;

/// Translation table from canonical statuses to the labels an application
/// stores in its records.
///
/// Statuses without an entry use their canonical name. The effective
/// mapping must be injective so every stored label decodes to exactly one
/// status.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(
    try_from = "HashMap<FormStatus, String>",
    into = "HashMap<FormStatus, String>"
)]
pub struct StatusLabels {
    overrides: HashMap<FormStatus, String>,
}

impl StatusLabels {
    pub fn new(overrides: HashMap<FormStatus, String>) -> Result<Self, FormsError> {
        if let Some((status, _)) = overrides.iter().find(|(_, label)| label.is_empty()) {
            return Err(FormsError::InvalidLabels(format!(
                "empty label for status {status}"
            )));
        }

        let labels = Self { overrides };

        {
            let mut seen = HashSet::new();
            for status in FormStatus::ALL {
                let label = labels.label(status);
                if !seen.insert(label) {
                    return Err(FormsError::InvalidLabels(format!(
                        "label '{label}' is used by more than one status"
                    )));
                }
            }
        }

        Ok(labels)
    }

    /// Label written to and expected from the store for `status`.
    pub fn label(&self, status: FormStatus) -> &str {
        self.overrides
            .get(&status)
            .map_or(status.as_str(), String::as_str)
    }

    /// Canonical status for a stored label, `None` for labels outside the table.
    pub fn canonical(&self, label: &str) -> Option<FormStatus> {
        FormStatus::ALL
            .into_iter()
            .find(|status| self.label(*status) == label)
    }

    pub fn is_identity(&self) -> bool {
        self.overrides
            .iter()
            .all(|(status, label)| status.as_str() == label)
    }
}

impl TryFrom<HashMap<FormStatus, String>> for StatusLabels {
    type Error = FormsError;
    fn try_from(overrides: HashMap<FormStatus, String>) -> Result<Self, Self::Error> {
        Self::new(overrides)
    }
}

impl From<StatusLabels> for HashMap<FormStatus, String> {
    fn from(labels: StatusLabels) -> Self {
        labels.overrides
    }
}
