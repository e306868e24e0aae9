//! Model validation errors

/// Errors raised while constructing or validating records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Ownership percentage outside [0, 100]
    #[error("invalid ownership percentage {percentage} for edge {parent_id} -> {child_id}")]
    InvalidPercentage {
        parent_id: String,
        child_id: String,
        percentage: f64,
    },

    /// Edge pointing from a company to itself
    #[error("self-ownership edge on {0}")]
    SelfOwnership(String),

    /// Unknown risk level label
    #[error("unknown risk level: {0}")]
    UnknownRiskLevel(String),
}
