//! Stage input payloads
//!
//! Plain key-value maps. Builders in the executor fill them from the
//! query intent and earlier stage outputs; stages read them with the typed
//! accessors below.

use crate::error::StageError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key-value input of one stage invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Create empty payload
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With string field
    #[inline]
    #[must_use]
    pub fn with_str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// With string-list field
    #[inline]
    #[must_use]
    pub fn with_strings<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = values.into_iter().map(|v| Value::String(v.into())).collect();
        self.0.insert(key.to_string(), Value::Array(list));
        self
    }

    /// With raw JSON field
    #[inline]
    #[must_use]
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// With date field in ISO form
    #[inline]
    #[must_use]
    pub fn with_date(self, key: &str, date: NaiveDate) -> Self {
        self.with_str(key, date.format("%Y-%m-%d").to_string())
    }

    /// Check for a field
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Raw field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field, `None` when absent, not a string, or blank
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Required non-blank string field
    ///
    /// # Errors
    /// [`StageError::InvalidPayload`] when absent or blank.
    pub fn require_str(&self, key: &str) -> Result<&str, StageError> {
        self.str(key)
            .ok_or_else(|| StageError::invalid(key, "required string is missing"))
    }

    /// String-list field; absent yields an empty list, a single string a
    /// one-element list
    ///
    /// # Errors
    /// [`StageError::InvalidPayload`] when the value is neither.
    pub fn strings(&self, key: &str) -> Result<Vec<String>, StageError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| StageError::invalid(key, "list items must be strings"))
                })
                .collect(),
            Some(_) => Err(StageError::invalid(key, "expected a list of strings")),
        }
    }

    /// Optional ISO date field
    ///
    /// # Errors
    /// [`StageError::InvalidPayload`] when present but not `YYYY-MM-DD`.
    pub fn date(&self, key: &str) -> Result<Option<NaiveDate>, StageError> {
        self.str(key)
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| StageError::invalid(key, e.to_string()))
            })
            .transpose()
    }

    /// Field deserialized into `T`
    ///
    /// # Errors
    /// [`StageError::InvalidPayload`] when the value does not fit `T`.
    pub fn typed<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StageError> {
        self.0
            .get(key)
            .filter(|v| !v.is_null())
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| StageError::invalid(key, e.to_string())))
            .transpose()
    }
}
