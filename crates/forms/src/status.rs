/// Canonical lifecycle status of a submitted form.
///
/// The label stored in the record may differ (see `StatusLabels`); all
/// decisions are made on the canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormStatus {
    /// Initial write acknowledged, not yet picked up.
    Submit,
    /// Accepted by the worker.
    Submitted,
    /// Worker deferred processing; the form can still be cancelled.
    Delay,
    /// Cancellation requested, waiting for the worker to confirm.
    Cancel,
    Cancelled,
    Finished,
    ValidationError,
    SecurityError,
    /// Terminal failure, also used for a submission that timed out.
    Error,
}

impl FormStatus {
    pub const ALL: [Self; 9] = [
        Self::Submit,
        Self::Submitted,
        Self::Delay,
        Self::Cancel,
        Self::Cancelled,
        Self::Finished,
        Self::ValidationError,
        Self::SecurityError,
        Self::Error,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::Finished
                | Self::ValidationError
                | Self::SecurityError
                | Self::Error
        )
    }

    /// Statuses for which the worker attaches diagnostics to the record.
    pub fn carries_messages(self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::ValidationError | Self::SecurityError | Self::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Submitted => "submitted",
            Self::Delay => "delay",
            Self::Cancel => "cancel",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
            Self::ValidationError => "validation-error",
            Self::SecurityError => "security-error",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FormStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown form status: {s}"))
    }
}
