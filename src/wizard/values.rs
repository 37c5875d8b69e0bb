use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field value: scalar, list or nested object.
pub type FieldValue = Value;

/// Current values of a wizard, keyed by field and kept in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(IndexMap<String, FieldValue>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Trimmed string value, `None` for anything that is not a non-empty string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Toggles read as `false` unless explicitly set to `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).map(is_present).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(key.into(), value)
    }
}

impl FromIterator<(String, FieldValue)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        FormValues(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, FieldValue)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (&'a str, FieldValue)>>(iter: I) -> Self {
        FormValues(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Whether a value counts as "filled in".
///
/// `false` is a real answer for a toggle, so booleans are always present.
pub fn is_present(value: &FieldValue) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Short human-readable name of a JSON value's type, used in diagnostics.
pub fn type_name(value: &FieldValue) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
