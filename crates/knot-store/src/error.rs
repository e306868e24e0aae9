//! Store errors

use knot_model::ModelError;
use std::path::PathBuf;

/// Errors raised by the record stores and dataset loading
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced record is absent
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Dataset file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset file is not valid JSON for its record type
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// Record failed validation
    #[error("invalid record: {0}")]
    Invalid(#[from] ModelError),
}

impl StoreError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if the error is a missing record
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = StoreError::not_found("patent", "PAT999");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "patent not found: PAT999");
    }
}
