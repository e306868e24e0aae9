//! KNOT Core - query orchestration
//!
//! Answers natural-language questions about a patent portfolio:
//!
//! 1. [`IntentParser`] reads the goal, entities and jurisdictions
//! 2. [`Planner`] maps the goal to a stage template, validated as a DAG
//! 3. [`StageExecutor`] runs the stages one at a time, isolating failures
//! 4. [`Synthesizer`] folds the stage outputs into a [`UnifiedReport`]
//!
//! [`QueryOrchestrator`] wires the four together and optionally hands the
//! query to a [`DelegateOrchestrator`] first.
//!
//! # Example
//!
//! ```rust,ignore
//! use knot_core::prelude::*;
//!
//! let config = KnotConfig::load(None)?;
//! let stores = stores_for(&config)?;
//! let orchestrator = QueryOrchestrator::from_config(&config, &stores);
//!
//! let response = orchestrator.answer("Analyze FTO for IoT temperature sensor in US").await?;
//! if let Some(report) = response.report() {
//!     println!("{}", report.executive_summary);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod delegate;
pub mod error;
pub mod executor;
pub mod intent;
pub mod orchestrator;
pub mod payloads;
pub mod plan;
pub mod planner;
pub mod synthesis;

pub use config::KnotConfig;
pub use delegate::{DelegateOrchestrator, DelegateReply};
pub use error::{KnotError, PlanError};
pub use executor::{ExecutionResults, StageExecutor, StageRecord, StageStatus};
pub use intent::{Goal, IntentParser, QueryIntent};
pub use orchestrator::{advisor_for, stores_for, ParsedQuery, QueryOrchestrator, QueryResponse, Suggestion};
pub use plan::{ExecutionPlan, PlannedStage};
pub use planner::Planner;
pub use synthesis::{Orchestration, Section, SectionCategory, Synthesizer, UnifiedReport};

/// Result type alias for KNOT operations
pub type Result<T> = std::result::Result<T, KnotError>;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for KNOT users
    pub use crate::{
        stores_for, ExecutionPlan, Goal, KnotConfig, KnotError, QueryIntent, QueryOrchestrator,
        QueryResponse, Result, UnifiedReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
