//! Capability and task identifiers

use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One domain analysis capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    DataQuality,
    CorporateResolution,
    MarketMatching,
    Ingestion,
    Integration,
    LandscapeAnalysis,
    FtoRiskAnalysis,
    PriorArtSearch,
}

impl Capability {
    /// Every capability
    pub const ALL: [Capability; 8] = [
        Self::DataQuality,
        Self::CorporateResolution,
        Self::MarketMatching,
        Self::Ingestion,
        Self::Integration,
        Self::LandscapeAnalysis,
        Self::FtoRiskAnalysis,
        Self::PriorArtSearch,
    ];

    /// Stable identifier used in plans and reports
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::DataQuality => "data-quality",
            Self::CorporateResolution => "corporate-resolution",
            Self::MarketMatching => "market-matching",
            Self::Ingestion => "ingestion",
            Self::Integration => "integration",
            Self::LandscapeAnalysis => "landscape-analysis",
            Self::FtoRiskAnalysis => "fto-risk-analysis",
            Self::PriorArtSearch => "prior-art-search",
        }
    }

    /// Task kinds this capability accepts
    #[must_use]
    pub fn tasks(self) -> &'static [TaskKind] {
        use TaskKind as T;
        match self {
            Self::DataQuality => &[T::NormalizePatent, T::ValidatePatent, T::ProcessText],
            Self::CorporateResolution => &[T::ResolveParent, T::ResolveAssignees, T::OwnershipGraph],
            Self::MarketMatching => &[T::MatchDescription, T::FindProductMatches],
            Self::Ingestion => &[T::FetchPatents, T::FetchBySource, T::CheckStatus],
            Self::Integration => &[T::DetectDuplicates, T::UnifyRecords, T::ResolveConflict],
            Self::LandscapeAnalysis => &[T::AnalyzeLandscape, T::FindWhiteSpaces],
            Self::FtoRiskAnalysis => &[T::AnalyzeFto, T::CheckPatent],
            Self::PriorArtSearch => &[T::FindPriorArt, T::AssessValidity],
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Capability {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.id() == s)
            .ok_or_else(|| StageError::UnknownCapability(s.to_string()))
    }
}

/// Unit of work a capability can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    NormalizePatent,
    ValidatePatent,
    ProcessText,
    ResolveParent,
    ResolveAssignees,
    OwnershipGraph,
    MatchDescription,
    FindProductMatches,
    FetchPatents,
    FetchBySource,
    CheckStatus,
    DetectDuplicates,
    UnifyRecords,
    ResolveConflict,
    AnalyzeLandscape,
    FindWhiteSpaces,
    AnalyzeFto,
    CheckPatent,
    FindPriorArt,
    AssessValidity,
}

impl TaskKind {
    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NormalizePatent => "normalize_patent",
            Self::ValidatePatent => "validate_patent",
            Self::ProcessText => "process_text",
            Self::ResolveParent => "resolve_parent",
            Self::ResolveAssignees => "resolve_assignees",
            Self::OwnershipGraph => "ownership_graph",
            Self::MatchDescription => "match_description",
            Self::FindProductMatches => "find_product_matches",
            Self::FetchPatents => "fetch_patents",
            Self::FetchBySource => "fetch_by_source",
            Self::CheckStatus => "check_status",
            Self::DetectDuplicates => "detect_duplicates",
            Self::UnifyRecords => "unify_records",
            Self::ResolveConflict => "resolve_conflict",
            Self::AnalyzeLandscape => "analyze_landscape",
            Self::FindWhiteSpaces => "find_white_spaces",
            Self::AnalyzeFto => "analyze_fto",
            Self::CheckPatent => "check_patent",
            Self::FindPriorArt => "find_prior_art",
            Self::AssessValidity => "assess_validity",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
