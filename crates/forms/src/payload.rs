use serde_json::{Map, Value};

use crate::error::FormsError;
use crate::keys::{fields, markers};

/// Operation a form asks the worker to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Caller-supplied form payload. A JSON object whose content is opaque to
/// the client apart from the `@actionType` and `@delay` markers.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FormData(Map<String, Value>);

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_action(self, action: ActionType) -> Self {
        self.with(markers::ACTION_TYPE, action.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn action_type(&self) -> Option<ActionType> {
        self.0
            .get(markers::ACTION_TYPE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// True when the payload carries a truthy `@delay` marker: present and
    /// not null, `false`, zero, or an empty string.
    pub fn has_delay(&self) -> bool {
        match self.0.get(markers::DELAY) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_) | Value::Object(_)) => true,
        }
    }

    /// Payload as handed to status handlers: this payload plus
    /// `submittedAt`, the status label, and messages when present.
    pub(crate) fn enriched(
        &self,
        submitted_at: u64,
        status_label: &str,
        messages: Option<Value>,
    ) -> FormData {
        let mut data = self.0.clone();
        data.insert(fields::SUBMITTED_AT.to_string(), Value::from(submitted_at));
        data.insert(
            fields::STATUS.to_string(),
            Value::String(status_label.to_string()),
        );
        if let Some(messages) = messages {
            data.insert(fields::MESSAGES.to_string(), messages);
        }
        FormData(data)
    }
}

impl From<Map<String, Value>> for FormData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for FormData {
    type Error = FormsError;
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FormsError::InvalidPayload(format!(
                "form data must be a JSON object, got {other}"
            ))),
        }
    }
}
