//! Error types for KNOT Core
//!
//! Query-level failures only. Stage failures never reach these types: the
//! executor records them in the failing stage's result slot.

use knot_stages::Capability;
use knot_store::StoreError;

/// Main KNOT error type
#[derive(Debug, thiserror::Error)]
pub enum KnotError {
    /// Empty or unusable query text
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// Plan construction failed
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Record store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Delegate orchestrator failed
    #[error("delegate failed: {0}")]
    Delegate(String),

    /// Timeout
    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl KnotError {
    /// Check if retrying could help
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Delegate(_))
    }

    /// Check if the caller supplied bad input
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::MalformedQuery(_))
    }
}

/// Invalid execution plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Two stages share an id
    #[error("duplicate stage id: {0}")]
    DuplicateStage(String),

    /// Dependency names no stage in the plan
    #[error("stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency { stage: String, dependency: String },

    /// Dependencies form a cycle
    #[error("dependency cycle through stage {0}")]
    CyclicDependency(String),

    /// Task not handled by the stage's capability
    #[error("stage {stage}: {capability} cannot run {task}")]
    TaskMismatch {
        stage: String,
        capability: Capability,
        task: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_error_converts() {
        let err: KnotError = PlanError::DuplicateStage("ingestion".into()).into();
        assert_eq!(err.to_string(), "planning failed: duplicate stage id: ingestion");
        assert!(!err.is_retryable());
    }

    #[test]
    fn classification() {
        assert!(KnotError::Timeout { ms: 10 }.is_retryable());
        assert!(KnotError::MalformedQuery("empty".into()).is_user_error());
        assert!(!KnotError::Config("bad".into()).is_user_error());
    }
}
