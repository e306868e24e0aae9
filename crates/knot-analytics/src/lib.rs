//! KNOT Analytics - the algorithmic primitives behind every analysis stage
//!
//! - [`text`]: normalization and deterministic keyword extraction
//! - [`similarity`]: Jaccard scoring over keyword sets and risk banding
//! - [`ownership`]: ultimate-parent resolution, subsidiary closure, cycle
//!   detection and name resolution over an ownership graph
//! - [`clustering`]: classification-prefix clustering with fixed-point
//!   merging, plus white-space detection
//!
//! # Example
//!
//! ```rust,ignore
//! use knot_analytics::{keyword_similarity, risk_from_score};
//!
//! let score = keyword_similarity(&["iot", "sensor"], &["sensor", "cloud"]);
//! assert_eq!(risk_from_score(score).as_str(), "high");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clustering;
pub mod ownership;
pub mod similarity;
pub mod text;

pub use clustering::{find_white_spaces, Cluster, LandscapeClusterer, WhiteSpace, WhiteSpaceKind};
pub use ownership::{AssigneeResolution, OwnershipResolver, OwnershipSource, OwnershipSubgraph};
pub use similarity::{
    keyword_set, keyword_similarity, risk_from_score, set_similarity, text_overlap, TextOverlap,
    HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
pub use text::{
    detect_language, extract_claim_numbers, extract_keywords, normalize_text, KeywordExtractor,
    StopWordExtractor, DEFAULT_MAX_KEYWORDS,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for analysis code
    pub use crate::{
        keyword_similarity, risk_from_score, set_similarity, KeywordExtractor, LandscapeClusterer,
        OwnershipResolver, OwnershipSource, StopWordExtractor,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
