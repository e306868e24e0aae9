//! Data quality: normalization, field validation and OCR cleanup

use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use knot_analytics::{detect_language, normalize_text, KeywordExtractor};
use knot_model::Claim;
use knot_store::{Normalization, PatentStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Normalized text of one patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPatent {
    pub patent_id: String,
    pub normalized_title: String,
    pub normalized_abstract: String,
    pub normalized_claims: Vec<Claim>,
    pub keywords: Vec<String>,
    pub language: String,
}

/// Field-level validation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentValidation {
    pub patent_id: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Cleaned-up free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedText {
    pub processed_text: String,
    pub keywords: Vec<String>,
    pub language: String,
}

/// Normalizes and validates stored patent records
#[derive(Debug, Clone)]
pub struct DataQualityStage {
    patents: Arc<PatentStore>,
    extractor: Arc<dyn KeywordExtractor>,
}

impl DataQualityStage {
    /// Create new stage
    #[inline]
    #[must_use]
    pub fn new(patents: Arc<PatentStore>, extractor: Arc<dyn KeywordExtractor>) -> Self {
        Self { patents, extractor }
    }

    fn normalize_patent(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent_id = payload.require_str("patent_id")?;
        let patent = self.patents.require(patent_id)?;

        let normalized_title = normalize_text(&patent.title);
        let normalized_abstract = normalize_text(&patent.abstract_text);
        let normalized_claims: Vec<Claim> = patent
            .claims
            .iter()
            .map(|claim| Claim {
                normalized_text: Some(normalize_text(&claim.text)),
                ..claim.clone()
            })
            .collect();

        let keywords = if patent.keywords.is_empty() {
            self.extractor.keywords(&patent.full_text())
        } else {
            patent.keywords.clone()
        };
        let language_source = if patent.raw_text.is_empty() {
            &patent.abstract_text
        } else {
            &patent.raw_text
        };
        let language = detect_language(language_source).to_string();

        self.patents.apply_normalization(
            &patent.id,
            Normalization {
                title: normalized_title.clone(),
                abstract_text: normalized_abstract.clone(),
                claims: normalized_claims
                    .iter()
                    .filter_map(|c| c.normalized_text.clone().map(|t| (c.number, t)))
                    .collect(),
            },
        )?;

        let report = NormalizedPatent {
            patent_id: patent.id,
            normalized_title,
            normalized_abstract,
            normalized_claims,
            keywords,
            language,
        };
        Ok(StageOutcome::new(StageOutput::NormalizedPatent(report), 0.95))
    }

    fn validate_patent(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent_id = payload.require_str("patent_id")?;
        let patent = self.patents.require(patent_id)?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        if patent.title.trim().is_empty() {
            errors.push("Missing title".to_string());
        }
        if patent.abstract_text.trim().is_empty() {
            warnings.push("Missing abstract".to_string());
        }
        if patent.claims.is_empty() {
            errors.push("Missing claims".to_string());
        }
        if patent.assignees.is_empty() {
            warnings.push("Missing assignees".to_string());
        }
        if patent.publication_number.trim().is_empty() {
            errors.push("Missing publication number".to_string());
        }
        if patent.filing_date.is_none() {
            warnings.push("Missing filing date".to_string());
        }
        if patent.source.trim().is_empty() {
            errors.push("Missing source".to_string());
        }

        let is_valid = errors.is_empty();
        let report = PatentValidation {
            patent_id: patent.id,
            is_valid,
            errors,
            warnings,
        };
        let confidence = if is_valid { 1.0 } else { 0.5 };
        Ok(StageOutcome::new(StageOutput::Validation(report), confidence))
    }

    fn process_text(&self, payload: &Payload) -> StageOutcome {
        let raw = payload.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        // Scanned input is only normalized; no recognition engine is attached
        let processed_text = normalize_text(raw);
        let report = ProcessedText {
            keywords: self.extractor.keywords(&processed_text),
            language: detect_language(raw).to_string(),
            processed_text,
        };
        StageOutcome::new(StageOutput::ProcessedText(report), 0.9)
    }
}

#[async_trait::async_trait]
impl AnalysisStage for DataQualityStage {
    fn capability(&self) -> Capability {
        Capability::DataQuality
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::NormalizePatent => self.normalize_patent(payload),
            TaskKind::ValidatePatent => self.validate_patent(payload),
            TaskKind::ProcessText => Ok(self.process_text(payload)),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knot_analytics::StopWordExtractor;
    use knot_model::Patent;
    use knot_test_utils::{patent, stores_with};
    use pretty_assertions::assert_eq;

    fn stage(patents: Vec<Patent>) -> (DataQualityStage, Arc<PatentStore>) {
        let stores = stores_with(patents, Vec::new(), Vec::new());
        let store = Arc::clone(&stores.patents);
        (DataQualityStage::new(store.clone(), Arc::new(StopWordExtractor)), store)
    }

    #[tokio::test]
    async fn normalization_is_written_back() {
        let mut raw = patent("P1", "A Wireless, Temperature-Sensor!", &[]);
        raw.title = "Smart  SENSOR".into();
        let (stage, store) = stage(vec![raw]);

        let outcome = stage
            .execute(TaskKind::NormalizePatent, &Payload::new().with_str("patent_id", "P1"))
            .await
            .unwrap();
        let StageOutput::NormalizedPatent(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.normalized_title, "smart sensor");
        assert_eq!(report.keywords, vec!["smart", "sensor", "wireless", "temperature-sensor"]);
        assert_eq!(report.language, "en");

        let stored = store.get("P1").unwrap();
        assert_eq!(stored.normalized_title.as_deref(), Some("smart sensor"));
        assert_eq!(
            stored.claims[0].normalized_text.as_deref(),
            Some("a wireless temperature-sensor")
        );
    }

    #[tokio::test]
    async fn validation_reports_errors_and_warnings() {
        let mut broken = Patent::new("P2", "USPTO", "", "Sensor");
        broken.abstract_text.clear();
        let (stage, _) = stage(vec![broken]);

        let outcome = stage
            .execute(TaskKind::ValidatePatent, &Payload::new().with_str("patent_id", "P2"))
            .await
            .unwrap();
        assert_eq!(outcome.confidence, 0.5);
        let StageOutput::Validation(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Missing claims", "Missing publication number"]);
        assert_eq!(
            report.warnings,
            vec!["Missing abstract", "Missing assignees", "Missing filing date"]
        );
    }

    #[tokio::test]
    async fn unknown_patent_is_not_found() {
        let (stage, _) = stage(Vec::new());
        let err = stage
            .execute(TaskKind::ValidatePatent, &Payload::new().with_str("patent_id", "NOPE"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn process_text_cleans_input() {
        let (stage, _) = stage(Vec::new());
        let payload = Payload::new().with_str("text", "  Sensor  NODE;; reports\n");
        let outcome = stage.execute(TaskKind::ProcessText, &payload).await.unwrap();
        let StageOutput::ProcessedText(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.processed_text, "sensor node reports");
        assert_eq!(outcome.confidence, 0.9);
    }

    #[tokio::test]
    async fn foreign_tasks_are_rejected() {
        let (stage, _) = stage(Vec::new());
        let err = stage
            .execute(TaskKind::AnalyzeFto, &Payload::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::UnsupportedTask { .. }));
    }
}
