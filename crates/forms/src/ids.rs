use crate::error::FormsError;

/// Identity of whoever submits forms. Becomes a path segment of every
/// record key, so it is restricted to alphanumerics, hyphens, and
/// underscores, 1-128 chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmitterId(String);

impl SubmitterId {
    pub fn new(raw: &str) -> Result<Self, FormsError> {
        if raw.is_empty()
            || raw.len() > 128
            || !raw
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(FormsError::InvalidSubmitterId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubmitterId {
    type Error = FormsError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<SubmitterId> for String {
    fn from(id: SubmitterId) -> String {
        id.0
    }
}

impl std::fmt::Display for SubmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubmitterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
