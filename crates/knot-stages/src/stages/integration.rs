//! Integration: duplicate detection, record unification, conflict resolution

use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use knot_analytics::{keyword_similarity, normalize_text};
use knot_store::PatentStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Keyword overlap above which two records are treated as duplicates
pub const DUPLICATE_THRESHOLD: f64 = 0.6;

/// How a duplicate was recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Title,
    Keywords,
}

/// A probable duplicate record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duplicate {
    pub patent_id: String,
    pub title: String,
    pub similarity: f64,
    pub match_type: MatchType,
}

/// Duplicates of one patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub patent_id: String,
    pub duplicates: Vec<Duplicate>,
    pub duplicate_count: usize,
}

/// Several records merged into one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub unified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    pub merged_keywords: Vec<String>,
    pub sources: Vec<String>,
    pub records_merged: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Strategy used to settle a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    SourcePriority,
    None,
}

/// Chosen value for a contested field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub field: String,
    pub resolved_value: Option<Value>,
    pub strategy: ConflictStrategy,
}

/// Registry authority, higher wins
fn source_priority(source: &str) -> u8 {
    match source {
        "USPTO" => 3,
        "EPO" => 2,
        "CGPDTM" => 1,
        _ => 0,
    }
}

/// Reconciles records describing the same invention
#[derive(Debug, Clone)]
pub struct IntegrationStage {
    patents: Arc<PatentStore>,
}

impl IntegrationStage {
    /// Create new stage
    #[inline]
    #[must_use]
    pub fn new(patents: Arc<PatentStore>) -> Self {
        Self { patents }
    }

    fn detect_duplicates(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent_id = payload.require_str("patent_id")?;
        let patent = self.patents.require(patent_id)?;
        let title = normalize_text(&patent.title);

        let duplicates: Vec<Duplicate> = self
            .patents
            .get_all()
            .into_iter()
            .filter(|other| other.id != patent.id)
            .filter_map(|other| {
                let title_match = normalize_text(&other.title) == title;
                let similarity = keyword_similarity(&patent.keywords, &other.keywords);
                (title_match || similarity > DUPLICATE_THRESHOLD).then(|| Duplicate {
                    patent_id: other.id,
                    title: other.title,
                    similarity,
                    match_type: if title_match {
                        MatchType::Title
                    } else {
                        MatchType::Keywords
                    },
                })
            })
            .collect();

        let report = DuplicateReport {
            patent_id: patent.id,
            duplicate_count: duplicates.len(),
            duplicates,
        };
        Ok(StageOutcome::new(StageOutput::Duplicates(report), 0.85))
    }

    fn unify_records(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patents: Vec<_> = payload
            .strings("patent_ids")?
            .iter()
            .filter_map(|id| self.patents.get(id))
            .collect();

        // Latest publication wins; undated records lose to dated ones
        let Some(canonical) = patents.iter().max_by_key(|p| p.publication_date) else {
            let report = UnifiedRecord {
                unified: false,
                canonical_id: None,
                merged_keywords: Vec::new(),
                sources: Vec::new(),
                records_merged: 0,
                error: Some("No valid patents found".to_string()),
            };
            return Ok(StageOutcome::new(StageOutput::Unified(report), 0.0));
        };

        let keywords: BTreeSet<&str> = patents
            .iter()
            .flat_map(|p| p.keywords.iter().map(String::as_str))
            .collect();
        let sources: BTreeSet<&str> = patents.iter().map(|p| p.source.as_str()).collect();

        let report = UnifiedRecord {
            unified: true,
            canonical_id: Some(canonical.id.clone()),
            merged_keywords: keywords.into_iter().map(str::to_string).collect(),
            sources: sources.into_iter().map(str::to_string).collect(),
            records_merged: patents.len(),
            error: None,
        };
        Ok(StageOutcome::new(StageOutput::Unified(report), 0.9))
    }

    fn resolve_conflict(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let field = payload.str("field").unwrap_or_default().to_string();
        let values = match payload.get("values") {
            Some(Value::Array(values)) => values.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(StageError::invalid("values", "expected a list")),
        };
        let sources = payload.strings("sources")?;

        if values.is_empty() {
            let report = ConflictResolution {
                field,
                resolved_value: None,
                strategy: ConflictStrategy::None,
            };
            return Ok(StageOutcome::new(StageOutput::Conflict(report), 0.0));
        }

        // Highest priority source, first one on ties; unknown sources never win
        let mut best = (0, 0);
        for (index, source) in sources.iter().enumerate() {
            let priority = source_priority(source);
            if priority > best.1 {
                best = (index, priority);
            }
        }
        let resolved = values.get(best.0).unwrap_or(&values[0]).clone();

        let report = ConflictResolution {
            field,
            resolved_value: Some(resolved),
            strategy: ConflictStrategy::SourcePriority,
        };
        Ok(StageOutcome::new(StageOutput::Conflict(report), 0.8))
    }
}

#[async_trait::async_trait]
impl AnalysisStage for IntegrationStage {
    fn capability(&self) -> Capability {
        Capability::Integration
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::DetectDuplicates => self.detect_duplicates(payload),
            TaskKind::UnifyRecords => self.unify_records(payload),
            TaskKind::ResolveConflict => self.resolve_conflict(payload),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}
