//! Typed stage outputs

use crate::stages::corporate::{AssigneeReport, OwnershipGraphReport, ParentResolution};
use crate::stages::data_quality::{NormalizedPatent, PatentValidation, ProcessedText};
use crate::stages::fto::{FtoReport, PatentRiskReport};
use crate::stages::ingestion::{FetchReport, IngestionStatus};
use crate::stages::integration::{ConflictResolution, DuplicateReport, UnifiedRecord};
use crate::stages::landscape::{LandscapeReport, WhiteSpaceReport};
use crate::stages::market::{PatentMatchReport, ProductMatchReport};
use crate::stages::prior_art::{PriorArtReport, ValidityReport};
use serde::{Deserialize, Serialize};

/// Report produced by one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    NormalizedPatent(NormalizedPatent),
    Validation(PatentValidation),
    ProcessedText(ProcessedText),
    ParentResolution(ParentResolution),
    AssigneeResolutions(AssigneeReport),
    OwnershipGraph(OwnershipGraphReport),
    PatentMatches(PatentMatchReport),
    ProductMatches(ProductMatchReport),
    Fetch(FetchReport),
    IngestionStatus(IngestionStatus),
    Duplicates(DuplicateReport),
    Unified(UnifiedRecord),
    Conflict(ConflictResolution),
    Landscape(LandscapeReport),
    WhiteSpaces(WhiteSpaceReport),
    Fto(FtoReport),
    PatentRisk(PatentRiskReport),
    PriorArt(PriorArtReport),
    Validity(ValidityReport),
}

impl StageOutput {
    /// Serialized tag of the variant
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NormalizedPatent(_) => "normalized_patent",
            Self::Validation(_) => "validation",
            Self::ProcessedText(_) => "processed_text",
            Self::ParentResolution(_) => "parent_resolution",
            Self::AssigneeResolutions(_) => "assignee_resolutions",
            Self::OwnershipGraph(_) => "ownership_graph",
            Self::PatentMatches(_) => "patent_matches",
            Self::ProductMatches(_) => "product_matches",
            Self::Fetch(_) => "fetch",
            Self::IngestionStatus(_) => "ingestion_status",
            Self::Duplicates(_) => "duplicates",
            Self::Unified(_) => "unified",
            Self::Conflict(_) => "conflict",
            Self::Landscape(_) => "landscape",
            Self::WhiteSpaces(_) => "white_spaces",
            Self::Fto(_) => "fto",
            Self::PatentRisk(_) => "patent_risk",
            Self::PriorArt(_) => "prior_art",
            Self::Validity(_) => "validity",
        }
    }
}

/// Output of a successful stage run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub output: StageOutput,
    /// Always within `[0, 1]`
    pub confidence: f64,
}

impl StageOutcome {
    /// Create new outcome, clamping the confidence into `[0, 1]`
    #[must_use]
    pub fn new(output: StageOutput, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { output, confidence }
    }
}
