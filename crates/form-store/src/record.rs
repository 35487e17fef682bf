use bytes::Bytes;
use std::collections::HashMap;

/// A set of field/value pairs stored under one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub fields: HashMap<String, Bytes>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Bytes> {
        self.fields.get(field)
    }

    /// Field value as UTF-8, `None` if absent or not valid UTF-8.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Field value parsed as JSON. Bytes that are not valid JSON come back
    /// as a JSON string of their lossy UTF-8 decoding.
    pub fn get_json(&self, field: &str) -> Option<serde_json::Value> {
        let raw = self.fields.get(field)?;
        Some(
            serde_json::from_slice(raw)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(raw).into())),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, Bytes>> for Record {
    fn from(fields: HashMap<String, Bytes>) -> Self {
        Self { fields }
    }
}

/// What a change handler receives.
///
/// Some backends deliver the whole record on every change, others only the
/// field that changed. In the second case `changed_field` names it and
/// `current_value` holds just that field.
#[derive(Debug, Clone)]
pub struct Snapshot {
    key: String,
    value: Record,
    changed_field: Option<String>,
}

impl Snapshot {
    pub fn full(key: impl Into<String>, value: Record) -> Self {
        Self {
            key: key.into(),
            value,
            changed_field: None,
        }
    }

    pub fn field(key: impl Into<String>, field: impl Into<String>, value: Bytes) -> Self {
        let field = field.into();
        Self {
            key: key.into(),
            value: Record::new().with_field(field.clone(), value),
            changed_field: Some(field),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn current_value(&self) -> &Record {
        &self.value
    }

    pub fn changed_field(&self) -> Option<&str> {
        self.changed_field.as_deref()
    }
}
