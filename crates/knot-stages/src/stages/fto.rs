//! Freedom-to-operate risk analysis
//!
//! Patents are found by keyword, then filtered: lapsed patents (expired,
//! abandoned or past their expiry date) never contribute risk, and with
//! target markets only patents registered in one of them are kept. Each
//! remaining claim is scored against the product description, by the
//! advisor when one is attached and by keyword overlap otherwise.

use super::truncate;
use crate::advisor::Advisor;
use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use chrono::NaiveDate;
use knot_analytics::{risk_from_score, text_overlap, KeywordExtractor};
use knot_model::{Claim, Patent, RiskLevel};
use knot_store::PatentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims at or below this similarity are not reported
pub const CLAIM_RELEVANCE_THRESHOLD: f64 = 0.05;

const CLAIM_TEXT_LIMIT: usize = 200;

const CLAIM_PROMPT: &str = "You are a patent claim analyst. Compare the patent claim against \
the product description. Assess infringement risk (high/medium/low), give a similarity score \
(0.0-1.0), explain your reasoning in 2-3 sentences and suggest mitigation steps if risk is \
medium or high. Return ONLY valid JSON: {\"risk_level\": \"high\" | \"medium\" | \"low\", \
\"similarity_score\": 0.0-1.0, \"reasoning\": \"...\", \"mitigation_suggestions\": [\"...\"]}";

const RECOMMENDATION_PROMPT: &str = "You are a patent attorney assistant. Given the FTO analysis \
results below, write 2-4 concise, actionable recommendations for the product team. Return ONLY \
a JSON array of strings.";

/// One claim compared against the product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimMatch {
    pub patent_id: String,
    pub claim_number: u32,
    /// First 200 characters
    pub claim_text: String,
    pub similarity_score: f64,
    pub matched_keywords: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitigation_suggestions: Vec<String>,
}

/// Risk posed by one patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfringementAnalysis {
    pub patent_id: String,
    pub patent_title: String,
    pub assignee: String,
    pub overall_risk: RiskLevel,
    pub claim_matches: Vec<ClaimMatch>,
    pub recommendation: String,
}

/// Freedom-to-operate report for a product description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FtoReport {
    pub product_description: String,
    pub target_markets: Vec<String>,
    /// Worst risks first
    pub analyses: Vec<InfringementAnalysis>,
    pub overall_risk: RiskLevel,
    pub summary: String,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub low_risk_count: usize,
    pub recommendations: Vec<String>,
}

impl FtoReport {
    /// Id of the first high-risk patent
    #[must_use]
    pub fn highest_risk_patent(&self) -> Option<&str> {
        self.analyses
            .iter()
            .find(|a| a.overall_risk == RiskLevel::High)
            .map(|a| a.patent_id.as_str())
    }

    /// Distinct assignees in analysis order
    #[must_use]
    pub fn assignees(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for analysis in &self.analyses {
            if !analysis.assignee.is_empty() && !names.contains(&analysis.assignee) {
                names.push(analysis.assignee.clone());
            }
        }
        names
    }
}

/// Claim-level risk of one named patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRiskReport {
    pub patent_id: String,
    pub patent_title: String,
    /// Lapsed patents carry no risk whatever their claims say
    pub lapsed: bool,
    pub overall_risk: RiskLevel,
    pub claim_matches: Vec<ClaimMatch>,
}

#[derive(Debug, Deserialize)]
struct ClaimVerdict {
    risk_level: Option<String>,
    similarity_score: Option<f64>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    mitigation_suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RiskDigest<'a> {
    description: String,
    high: usize,
    medium: usize,
    low: usize,
    top_risks: Vec<TopRisk<'a>>,
}

#[derive(Debug, Serialize)]
struct TopRisk<'a> {
    patent: &'a str,
    risk: RiskLevel,
    rec: &'a str,
}

fn recommendation(level: RiskLevel, publication_number: &str) -> String {
    match level {
        RiskLevel::High => format!(
            "HIGH RISK: Patent {publication_number} has claims closely matching your product. Consider design-around or licensing."
        ),
        RiskLevel::Medium => format!(
            "MEDIUM RISK: Patent {publication_number} has some overlap. Monitor and consider legal review."
        ),
        RiskLevel::Low => format!("LOW RISK: Patent {publication_number} has minimal overlap."),
    }
}

fn heuristic_recommendations(high: usize, medium: usize, analyzed: usize) -> Vec<String> {
    let mut recommendations = Vec::new();
    if high > 0 {
        recommendations.push(format!(
            "Found {high} high-risk patent(s). Immediate legal review recommended."
        ));
    }
    if medium > 0 {
        recommendations.push(format!(
            "Found {medium} medium-risk patent(s). Consider design modifications."
        ));
    }
    if analyzed == 0 {
        recommendations.push("No significant patent risks identified in target markets.".to_string());
    }
    recommendations
}

/// Scores products against patent claims
#[derive(Debug, Clone)]
pub struct FtoRiskStage {
    patents: Arc<PatentStore>,
    advisor: Advisor,
    extractor: Arc<dyn KeywordExtractor>,
}

impl FtoRiskStage {
    /// Create new stage
    #[inline]
    #[must_use]
    pub fn new(patents: Arc<PatentStore>, advisor: Advisor, extractor: Arc<dyn KeywordExtractor>) -> Self {
        Self {
            patents,
            advisor,
            extractor,
        }
    }

    fn heuristic_match(&self, patent_id: &str, claim: &Claim, description: &str) -> ClaimMatch {
        let overlap = text_overlap(self.extractor.as_ref(), &claim.text, description);
        ClaimMatch {
            patent_id: patent_id.to_string(),
            claim_number: claim.number,
            claim_text: truncate(&claim.text, CLAIM_TEXT_LIMIT),
            similarity_score: overlap.score,
            matched_keywords: overlap.matched,
            risk_level: risk_from_score(overlap.score),
            reasoning: String::new(),
            mitigation_suggestions: Vec::new(),
        }
    }

    async fn score_claim(&self, patent_id: &str, claim: &Claim, description: &str) -> ClaimMatch {
        if self.advisor.is_enabled() {
            let prompt = format!(
                "Patent claim (claim {}):\n{}\n\nProduct description:\n{}",
                claim.number, claim.text, description
            );
            if let Some(verdict) = self.advisor.consult_json::<ClaimVerdict>(CLAIM_PROMPT, &prompt).await {
                let similarity = verdict.similarity_score.unwrap_or(0.0).clamp(0.0, 1.0);
                let risk = verdict
                    .risk_level
                    .as_deref()
                    .and_then(|r| r.parse().ok())
                    .unwrap_or_else(|| risk_from_score(similarity));
                return ClaimMatch {
                    patent_id: patent_id.to_string(),
                    claim_number: claim.number,
                    claim_text: truncate(&claim.text, CLAIM_TEXT_LIMIT),
                    similarity_score: similarity,
                    matched_keywords: Vec::new(),
                    risk_level: risk,
                    reasoning: verdict.reasoning,
                    mitigation_suggestions: verdict.mitigation_suggestions,
                };
            }
        }
        self.heuristic_match(patent_id, claim, description)
    }

    async fn analyze_patent(&self, patent: &Patent, description: &str) -> Option<InfringementAnalysis> {
        let mut claim_matches = Vec::new();
        let mut overall = RiskLevel::Low;
        for claim in &patent.claims {
            let matched = self.score_claim(&patent.id, claim, description).await;
            if matched.similarity_score > CLAIM_RELEVANCE_THRESHOLD {
                overall = overall.worst(matched.risk_level);
                claim_matches.push(matched);
            }
        }
        if claim_matches.is_empty() {
            return None;
        }
        Some(InfringementAnalysis {
            patent_id: patent.id.clone(),
            patent_title: patent.title.clone(),
            assignee: patent.primary_assignee().unwrap_or_default().to_string(),
            overall_risk: overall,
            claim_matches,
            recommendation: recommendation(overall, &patent.publication_number),
        })
    }

    async fn recommendations(
        &self,
        description: &str,
        analyses: &[InfringementAnalysis],
        counts: (usize, usize, usize),
    ) -> Vec<String> {
        let (high, medium, low) = counts;
        if self.advisor.is_enabled() && !analyses.is_empty() {
            let digest = RiskDigest {
                description: truncate(description, 300),
                high,
                medium,
                low,
                top_risks: analyses
                    .iter()
                    .take(5)
                    .map(|a| TopRisk {
                        patent: &a.patent_title,
                        risk: a.overall_risk,
                        rec: &a.recommendation,
                    })
                    .collect(),
            };
            if let Ok(digest) = serde_json::to_string(&digest) {
                let advised: Option<Vec<String>> =
                    self.advisor.consult_json(RECOMMENDATION_PROMPT, &digest).await;
                let advised: Vec<String> = advised
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|r| !r.trim().is_empty())
                    .collect();
                if !advised.is_empty() {
                    return advised;
                }
            }
        }
        heuristic_recommendations(high, medium, analyses.len())
    }

    async fn analyze_fto(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let description = payload.str("description").unwrap_or_default();
        let markets = payload.strings("target_markets")?;
        let mut keywords = payload.strings("keywords")?;
        if keywords.is_empty() {
            keywords = self.extractor.keywords(description);
        }
        let today = payload
            .date("as_of")?
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let mut candidates = self.patents.search_by_keywords(&keywords, &markets);
        if candidates.is_empty() && !markets.is_empty() {
            tracing::debug!("no patents in target markets, retrying without market filter");
            candidates = self.patents.search_by_keywords(&keywords, &[]);
        }

        let mut analyses = Vec::new();
        for patent in candidates.iter().filter(|p| self.in_scope(p, &markets, today)) {
            if let Some(analysis) = self.analyze_patent(patent, description).await {
                analyses.push(analysis);
            }
        }
        analyses.sort_by_key(|a| a.overall_risk);

        let count = |level| analyses.iter().filter(|a| a.overall_risk == level).count();
        let (high, medium, low) = (count(RiskLevel::High), count(RiskLevel::Medium), count(RiskLevel::Low));
        let overall_risk = analyses
            .iter()
            .map(|a| a.overall_risk)
            .fold(RiskLevel::Low, RiskLevel::worst);
        let recommendations = self
            .recommendations(description, &analyses, (high, medium, low))
            .await;

        tracing::info!(analyzed = analyses.len(), high, medium, low, overall = %overall_risk, "fto analysis complete");
        let report = FtoReport {
            product_description: truncate(description, 200),
            target_markets: markets,
            summary: format!(
                "FTO analysis found {} relevant patents: {high} high-risk, {medium} medium-risk, {low} low-risk.",
                analyses.len()
            ),
            analyses,
            overall_risk,
            high_risk_count: high,
            medium_risk_count: medium,
            low_risk_count: low,
            recommendations,
        };
        Ok(StageOutcome::new(StageOutput::Fto(report), 0.85))
    }

    fn in_scope(&self, patent: &Patent, markets: &[String], today: NaiveDate) -> bool {
        if patent.is_lapsed(today) {
            tracing::debug!(patent = %patent.id, status = %patent.status.as_str(), "skipping lapsed patent");
            return false;
        }
        patent.covers_any(markets)
    }

    fn check_patent(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent_id = payload.require_str("patent_id")?;
        let description = payload.str("description").unwrap_or_default();
        let today = payload
            .date("as_of")?
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let patent = self.patents.require(patent_id)?;

        let claim_matches: Vec<ClaimMatch> = patent
            .claims
            .iter()
            .map(|claim| self.heuristic_match(&patent.id, claim, description))
            .collect();
        let lapsed = patent.is_lapsed(today);
        let overall_risk = if lapsed {
            RiskLevel::Low
        } else {
            claim_matches
                .iter()
                .map(|m| m.risk_level)
                .fold(RiskLevel::Low, RiskLevel::worst)
        };

        let report = PatentRiskReport {
            patent_id: patent.id,
            patent_title: patent.title,
            lapsed,
            overall_risk,
            claim_matches,
        };
        Ok(StageOutcome::new(StageOutput::PatentRisk(report), 0.85))
    }
}

#[async_trait::async_trait]
impl AnalysisStage for FtoRiskStage {
    fn capability(&self) -> Capability {
        Capability::FtoRiskAnalysis
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::AnalyzeFto => self.analyze_fto(payload).await,
            TaskKind::CheckPatent => self.check_patent(payload),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}
