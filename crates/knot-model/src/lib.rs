//! KNOT Model - record types shared across the workspace
//!
//! Records are owned by the in-memory stores for the lifetime of the
//! process. Analysis code receives snapshots and never mutates them, with
//! the single exception of the normalization fields on [`Patent`] and
//! [`Claim`].
//!
//! # Example
//!
//! ```rust,ignore
//! use knot_model::{OwnershipEdge, Patent, PatentStatus};
//!
//! let edge = OwnershipEdge::new("COMP001", "COMP002", 100.0)?;
//! assert_eq!(edge.parent_id, "COMP001");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod company;
pub mod error;
pub mod market;
pub mod patent;
pub mod risk;

pub use company::{Company, CompanyType, OwnershipEdge};
pub use error::ModelError;
pub use market::{PriorArtCandidate, ProductInfo};
pub use patent::{Claim, ClaimKind, Classification, Inventor, Patent, PatentStatus};
pub use risk::RiskLevel;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
