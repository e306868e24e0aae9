//! Prior-art search and validity assessment
//!
//! A candidate published on or after the patent's filing date is dropped.
//! Undated candidates, and every candidate for an undated patent, are kept.

use super::{by_score_desc, truncate};
use crate::advisor::Advisor;
use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use knot_analytics::{keyword_set, keyword_similarity, KeywordExtractor};
use knot_model::{Patent, PriorArtCandidate};
use knot_store::{PatentStore, SearchStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Candidates at or below this relevance are dropped
pub const RELEVANCE_THRESHOLD: f64 = 0.05;
/// Claim-keyword to candidate-keyword overlap needed to flag a claim
const CLAIM_THRESHOLD: f64 = 0.1;
const LIKELY_INVALID_THRESHOLD: f64 = 0.5;
const QUESTIONABLE_THRESHOLD: f64 = 0.25;

const RELEVANCE_PROMPT: &str = "You are a patent prior art analyst. Compare the prior art \
disclosure against the target patent claims. Score relevance (0.0-1.0), list the claim numbers \
it may anticipate and those it may render obvious, and explain briefly. Return ONLY valid JSON: \
{\"relevance_score\": 0.0-1.0, \"analysis\": \"...\", \"anticipates_claims\": [1], \
\"obviousness_claims\": [2]}";

const VALIDITY_PROMPT: &str = "You are a patent validity analyst. Given a patent and the prior \
art found against it, write a 2-3 sentence validity opinion in plain language.";

/// One prior-art candidate scored against a patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorArtAnalysis {
    pub prior_art_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_patent_id: Option<String>,
    pub relevance_score: f64,
    pub matched_claims: Vec<u32>,
    pub matched_keywords: Vec<String>,
    pub analysis: String,
}

/// Prior art found for a patent or keyword set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorArtReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_id: Option<String>,
    /// Most relevant first
    pub prior_art_results: Vec<PriorArtAnalysis>,
    /// Candidates considered before scoring
    pub total_candidates: usize,
}

/// Validity verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    LikelyInvalid,
    Questionable,
    AppearsValid,
}

impl Validity {
    /// Verdict for the strongest relevance found
    #[must_use]
    pub fn from_relevance(relevance: f64) -> Self {
        if relevance > LIKELY_INVALID_THRESHOLD {
            Self::LikelyInvalid
        } else if relevance > QUESTIONABLE_THRESHOLD {
            Self::Questionable
        } else {
            Self::AppearsValid
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LikelyInvalid => "likely_invalid",
            Self::Questionable => "questionable",
            Self::AppearsValid => "appears_valid",
        }
    }
}

/// Validity assessment of one patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityReport {
    pub target_patent_id: String,
    pub target_patent_title: String,
    pub prior_art_results: Vec<PriorArtAnalysis>,
    pub overall_validity: Validity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strongest_prior_art: Option<PriorArtAnalysis>,
}

#[derive(Debug, Deserialize)]
struct RelevanceVerdict {
    relevance_score: Option<f64>,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    anticipates_claims: Vec<u32>,
    #[serde(default)]
    obviousness_claims: Vec<u32>,
}

fn percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

fn published(candidate: &PriorArtCandidate) -> String {
    candidate
        .publication_date
        .map_or_else(|| "on an unknown date".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// Searches the prior-art corpus
#[derive(Debug, Clone)]
pub struct PriorArtStage {
    patents: Arc<PatentStore>,
    search: Arc<SearchStore>,
    advisor: Advisor,
    extractor: Arc<dyn KeywordExtractor>,
}

impl PriorArtStage {
    /// Create new stage
    #[inline]
    #[must_use]
    pub fn new(
        patents: Arc<PatentStore>,
        search: Arc<SearchStore>,
        advisor: Advisor,
        extractor: Arc<dyn KeywordExtractor>,
    ) -> Self {
        Self {
            patents,
            search,
            advisor,
            extractor,
        }
    }

    fn lookup(&self, reference: &str) -> Result<Patent, StageError> {
        self.patents
            .find(reference)
            .ok_or_else(|| StageError::not_found("patent", reference))
    }

    fn matched_claims(&self, patent: &Patent, candidate: &PriorArtCandidate) -> Vec<u32> {
        patent
            .claims
            .iter()
            .filter(|claim| {
                keyword_similarity(&self.extractor.keywords(&claim.text), &candidate.keywords) > CLAIM_THRESHOLD
            })
            .map(|claim| claim.number)
            .collect()
    }

    async fn score(
        &self,
        patent: Option<&Patent>,
        keywords: &[String],
        candidate: PriorArtCandidate,
    ) -> PriorArtAnalysis {
        let relevance = keyword_similarity(keywords, &candidate.keywords);
        let matched_keywords: Vec<String> = keyword_set(&candidate.keywords)
            .intersection(&keyword_set(keywords))
            .cloned()
            .collect();
        let mut analysis = PriorArtAnalysis {
            prior_art_id: candidate.id.clone(),
            target_patent_id: patent.map(|p| p.id.clone()),
            relevance_score: relevance,
            matched_claims: patent.map(|p| self.matched_claims(p, &candidate)).unwrap_or_default(),
            matched_keywords,
            analysis: format!(
                "Prior art '{}' published {} has {} relevance.",
                candidate.title,
                published(&candidate),
                percent(relevance)
            ),
        };

        if let (true, Some(patent)) = (self.advisor.is_enabled(), patent) {
            let claims: Vec<String> = patent
                .claims
                .iter()
                .take(5)
                .map(|c| format!("Claim {}: {}", c.number, truncate(&c.text, 300)))
                .collect();
            let prompt = format!(
                "Target patent: {}\n{}\n\nPrior art: {}\n{}",
                patent.title,
                claims.join("\n"),
                candidate.title,
                truncate(&candidate.text, 1000)
            );
            if let Some(verdict) = self.advisor.consult_json::<RelevanceVerdict>(RELEVANCE_PROMPT, &prompt).await {
                if let Some(score) = verdict.relevance_score {
                    analysis.relevance_score = score.clamp(0.0, 1.0);
                }
                if !verdict.analysis.trim().is_empty() {
                    analysis.analysis = verdict.analysis;
                }
                let mut claims = verdict.anticipates_claims;
                claims.extend(verdict.obviousness_claims);
                claims.sort_unstable();
                claims.dedup();
                if !claims.is_empty() {
                    analysis.matched_claims = claims;
                }
            }
        }
        analysis
    }

    async fn search_for(
        &self,
        patent: Option<&Patent>,
        keywords: &[String],
    ) -> (Vec<PriorArtAnalysis>, usize) {
        let candidates: Vec<PriorArtCandidate> = self
            .search
            .search_prior_art(keywords)
            .into_iter()
            .filter(|c| patent.and_then(|p| p.filing_date).map_or(true, |filed| c.may_predate(filed)))
            .collect();
        let total = candidates.len();

        let mut results = Vec::with_capacity(total);
        for candidate in candidates {
            let analysis = self.score(patent, keywords, candidate).await;
            if analysis.relevance_score > RELEVANCE_THRESHOLD {
                results.push(analysis);
            }
        }
        results.sort_by(|a, b| by_score_desc(a.relevance_score, b.relevance_score));
        (results, total)
    }

    async fn find_prior_art(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent = payload
            .str("patent_id")
            .map(|reference| self.lookup(reference))
            .transpose()?;
        let mut keywords = payload.strings("keywords")?;
        if keywords.is_empty() {
            if let Some(patent) = &patent {
                keywords.clone_from(&patent.keywords);
            }
        }

        let (results, total) = self.search_for(patent.as_ref(), &keywords).await;
        tracing::debug!(candidates = total, relevant = results.len(), "prior art search complete");
        let confidence = if results.is_empty() { 0.5 } else { 0.8 };
        let report = PriorArtReport {
            patent_id: patent.map(|p| p.id),
            prior_art_results: results,
            total_candidates: total,
        };
        Ok(StageOutcome::new(StageOutput::PriorArt(report), confidence))
    }

    async fn assess_validity(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent = self.lookup(payload.require_str("patent_id")?)?;
        let (results, _) = self.search_for(Some(&patent), &patent.keywords).await;

        let strongest = results.first().cloned();
        let (validity, mut summary) = match &strongest {
            None => (
                Validity::AppearsValid,
                format!(
                    "No prior art found that predates patent {}. Patent appears novel.",
                    patent.publication_number
                ),
            ),
            Some(best) => {
                let validity = Validity::from_relevance(best.relevance_score);
                let pct = percent(best.relevance_score);
                let summary = match validity {
                    Validity::LikelyInvalid => format!(
                        "Strong prior art found with {pct} relevance. Patent validity is questionable."
                    ),
                    Validity::Questionable => format!(
                        "Moderate prior art found with {pct} relevance. Further investigation recommended."
                    ),
                    Validity::AppearsValid => format!(
                        "Only weak prior art found (max {pct} relevance). Patent appears valid."
                    ),
                };
                (validity, summary)
            }
        };

        if self.advisor.is_enabled() && !results.is_empty() {
            let found: Vec<String> = results
                .iter()
                .take(5)
                .map(|r| format!("{} ({} relevance): {}", r.prior_art_id, percent(r.relevance_score), r.analysis))
                .collect();
            let prompt = format!(
                "Patent: {} ({})\nPreliminary verdict: {}\n\nPrior art:\n{}",
                patent.title,
                patent.publication_number,
                validity.as_str(),
                found.join("\n")
            );
            if let Some(opinion) = self.advisor.consult_text(VALIDITY_PROMPT, &prompt).await {
                summary = opinion;
            }
        }

        tracing::info!(patent = %patent.id, validity = validity.as_str(), "validity assessed");
        let report = ValidityReport {
            target_patent_id: patent.id,
            target_patent_title: patent.title,
            prior_art_results: results,
            overall_validity: validity,
            summary,
            strongest_prior_art: strongest,
        };
        Ok(StageOutcome::new(StageOutput::Validity(report), 0.85))
    }
}

#[async_trait::async_trait]
impl AnalysisStage for PriorArtStage {
    fn capability(&self) -> Capability {
        Capability::PriorArtSearch
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::FindPriorArt => self.find_prior_art(payload).await,
            TaskKind::AssessValidity => self.assess_validity(payload).await,
            other => Err(unsupported(self.capability(), other)),
        }
    }
}
