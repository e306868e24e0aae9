//! Stage and advisor errors

use crate::capability::{Capability, TaskKind};
use knot_store::StoreError;

/// Errors raised by analysis stages
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Task kind not handled by the capability
    #[error("{capability} does not support task {task}")]
    UnsupportedTask { capability: Capability, task: TaskKind },

    /// No capability with this id
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// Referenced record is absent
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Payload missing a field or carrying the wrong shape
    #[error("invalid payload field '{field}': {reason}")]
    InvalidPayload { field: String, reason: String },

    /// Stage exceeded its time budget
    #[error("stage timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl StageError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create invalid-payload error
    #[inline]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is a missing record
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Store(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Check if retrying could help
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from the advisory language-model collaborator
///
/// Never surfaced to callers: the advisor logs them and falls back.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    /// Network or client failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },

    /// Reply did not arrive in time
    #[error("no reply within {ms}ms")]
    Timeout { ms: u64 },

    /// Reply could not be interpreted
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl AdvisorError {
    /// Check if retrying could help
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_display() {
        let err = StageError::UnsupportedTask {
            capability: Capability::Ingestion,
            task: TaskKind::AnalyzeFto,
        };
        assert_eq!(err.to_string(), "ingestion does not support task analyze_fto");
    }

    #[test]
    fn not_found_through_store() {
        assert!(StageError::from(StoreError::not_found("patent", "P1")).is_not_found());
        assert!(StageError::not_found("company", "C1").is_not_found());
        assert!(!StageError::invalid("patent_id", "missing").is_not_found());
    }

    #[test]
    fn advisor_retryable() {
        assert!(AdvisorError::Status { code: 503, body: String::new() }.is_retryable());
        assert!(!AdvisorError::Status { code: 400, body: String::new() }.is_retryable());
        assert!(!AdvisorError::Malformed("x".into()).is_retryable());
    }
}
