//! KNOT Stages - the domain analysis capabilities
//!
//! Eight stages, one per [`Capability`], each answering a fixed set of
//! [`TaskKind`]s over a [`Payload`]:
//!
//! - data quality: normalization, validation and text processing
//! - corporate resolution: ultimate parents, assignee mapping, ownership graphs
//! - market matching: patents against product descriptions and back
//! - ingestion: rate-limited simulated registry fetches
//! - integration: duplicates, record unification, conflict resolution
//! - landscape analysis: clusters, white spaces and ranked opportunities
//! - FTO risk analysis: claim-level infringement risk
//! - prior-art search: earlier disclosures and validity verdicts
//!
//! Stages that can use a language model hold an [`Advisor`]. Without a
//! client, or when the model fails, every stage takes its heuristic path.
//!
//! # Example
//!
//! ```rust,ignore
//! use knot_stages::prelude::*;
//!
//! let registry = StageRegistry::standard(&stores, Advisor::heuristic(), &StageSettings::default());
//! let fto = registry.get(Capability::FtoRiskAnalysis).unwrap();
//! let payload = Payload::new()
//!     .with_str("description", "IoT temperature sensor")
//!     .with_strings("target_markets", ["US"]);
//! let outcome = fto.execute(TaskKind::AnalyzeFto, &payload).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod advisor;
pub mod capability;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod outcome;
pub mod payload;
pub mod rate_limit;
pub mod registry;
pub mod stage;
pub mod stages;

pub use advisor::{Advisor, LlmClient, DEFAULT_ADVISOR_TIMEOUT};
pub use capability::{Capability, TaskKind};
pub use error::{AdvisorError, StageError};
#[cfg(feature = "http")]
pub use http::{HttpLlmClient, HttpLlmConfig};
pub use outcome::{StageOutcome, StageOutput};
pub use payload::Payload;
pub use rate_limit::RateLimiter;
pub use registry::{StageRegistry, StageSettings};
pub use stage::AnalysisStage;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for stage users
    pub use crate::{
        Advisor, AnalysisStage, Capability, Payload, StageError, StageOutcome, StageOutput,
        StageRegistry, StageSettings, TaskKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
