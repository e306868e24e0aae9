//! Market matching: linking patents and product descriptions

use super::{by_score_desc, truncate};
use crate::advisor::Advisor;
use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use knot_analytics::{keyword_set, keyword_similarity, text_overlap, KeywordExtractor};
use knot_store::{PatentStore, SearchStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Candidates kept per description
const MAX_PATENT_MATCHES: usize = 20;
/// Minimum keyword overlap for a match
const MATCH_THRESHOLD: f64 = 0.1;
/// Candidates above this overlap are worth asking the advisor about
const RESCORE_THRESHOLD: f64 = 0.05;

const RELEVANCE_PROMPT: &str = "You are a patent-product matching analyst. Given a patent's \
title and keywords alongside a product description, assess how relevant the patent is to the \
product. Return ONLY valid JSON: {\"relevance_score\": 0.0-1.0, \"evidence\": [\"reason\"]}";

/// A patent relevant to a product description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentMatch {
    pub patent_id: String,
    pub patent_title: String,
    pub assignee: String,
    pub similarity: f64,
    pub matched_keywords: Vec<String>,
    pub evidence: Vec<String>,
}

/// Patents matching a product description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentMatchReport {
    pub description: String,
    /// Best matches first, at most twenty
    pub matches: Vec<PatentMatch>,
    /// Matches found before truncation
    pub total_matches: usize,
}

/// A product a patent may read on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    pub product_id: String,
    pub product_name: String,
    pub company: String,
    pub similarity: f64,
    pub confidence: f64,
    pub matching_claims: Vec<u32>,
    pub matched_keywords: Vec<String>,
    pub evidence: Vec<String>,
}

/// Products matching one patent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMatchReport {
    pub patent_id: String,
    pub patent_title: String,
    pub matches: Vec<ProductMatch>,
    pub total_matches: usize,
}

#[derive(Debug, Deserialize)]
struct RelevanceReply {
    relevance_score: Option<f64>,
    #[serde(default)]
    evidence: Vec<String>,
}

/// Matches patents against products by keyword overlap
#[derive(Debug, Clone)]
pub struct MarketMatchingStage {
    patents: Arc<PatentStore>,
    search: Arc<SearchStore>,
    advisor: Advisor,
    extractor: Arc<dyn KeywordExtractor>,
}

impl MarketMatchingStage {
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

    async fn match_description(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let description = payload.str("description").unwrap_or_default();
        let mut keywords = payload.strings("keywords")?;
        if keywords.is_empty() {
            keywords = self.extractor.keywords(description);
        }
        let wanted = keyword_set(&keywords);

        let mut matches = Vec::new();
        for patent in self.patents.get_all() {
            let mut similarity = keyword_similarity(&keywords, &patent.keywords);
            let mut evidence = vec![format!("Keyword overlap: {similarity:.2}")];

            if self.advisor.is_enabled() && similarity > RESCORE_THRESHOLD {
                let prompt = format!(
                    "Patent: {}\nPatent keywords: {}\n\nProduct description: {}",
                    patent.title,
                    patent.keywords.iter().take(15).cloned().collect::<Vec<_>>().join(", "),
                    truncate(description, 500),
                );
                if let Some(reply) = self.advisor.consult_json::<RelevanceReply>(RELEVANCE_PROMPT, &prompt).await {
                    similarity = reply.relevance_score.unwrap_or(similarity).clamp(0.0, 1.0);
                    if !reply.evidence.is_empty() {
                        evidence = reply.evidence;
                    }
                }
            }

            if similarity > MATCH_THRESHOLD {
                matches.push(PatentMatch {
                    matched_keywords: keyword_set(&patent.keywords)
                        .intersection(&wanted)
                        .cloned()
                        .collect(),
                    assignee: patent.primary_assignee().unwrap_or_default().to_string(),
                    patent_id: patent.id,
                    patent_title: patent.title,
                    similarity,
                    evidence,
                });
            }
        }

        matches.sort_by(|a, b| by_score_desc(a.similarity, b.similarity));
        let total_matches = matches.len();
        matches.truncate(MAX_PATENT_MATCHES);

        let report = PatentMatchReport {
            description: truncate(description, 100),
            matches,
            total_matches,
        };
        Ok(StageOutcome::new(StageOutput::PatentMatches(report), 0.8))
    }

    fn find_product_matches(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let patent_id = payload.require_str("patent_id")?;
        let patent = self.patents.require(patent_id)?;
        let patent_keywords = keyword_set(&patent.keywords);

        let mut matches = Vec::new();
        for product in self.search.all_products() {
            let product_keywords = self
                .extractor
                .keywords(&format!("{} {}", product.name, product.description));
            let similarity = keyword_similarity(&patent.keywords, &product_keywords);
            if similarity <= MATCH_THRESHOLD {
                continue;
            }

            let matching_claims = patent
                .claims
                .iter()
                .filter(|claim| {
                    text_overlap(self.extractor.as_ref(), &claim.text, &product.description).score
                        > MATCH_THRESHOLD
                })
                .map(|claim| claim.number)
                .collect();

            matches.push(ProductMatch {
                matched_keywords: keyword_set(&product_keywords)
                    .intersection(&patent_keywords)
                    .cloned()
                    .collect(),
                product_id: product.id,
                product_name: product.name,
                company: product.company,
                similarity,
                confidence: (similarity * 2.0).min(1.0),
                matching_claims,
                evidence: vec![format!("Keyword overlap: {similarity:.2}")],
            });
        }
        matches.sort_by(|a, b| by_score_desc(a.confidence, b.confidence));

        let confidence = if matches.is_empty() { 0.5 } else { 0.85 };
        let report = ProductMatchReport {
            patent_id: patent.id,
            patent_title: patent.title,
            total_matches: matches.len(),
            matches,
        };
        Ok(StageOutcome::new(StageOutput::ProductMatches(report), confidence))
    }
}

#[async_trait::async_trait]
impl AnalysisStage for MarketMatchingStage {
    fn capability(&self) -> Capability {
        Capability::MarketMatching
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::MatchDescription => self.match_description(payload).await,
            TaskKind::FindProductMatches => self.find_product_matches(payload),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::MockLlmClient;
    use knot_analytics::StopWordExtractor;
    use knot_test_utils::{patent, product, stores_with};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn stage(advisor: Advisor) -> MarketMatchingStage {
        let stores = stores_with(
            vec![
                patent("P1", "A wireless temperature sensor node", &["wireless", "temperature", "sensor"]),
                patent("P2", "A hydraulic press", &["hydraulic", "press"]),
            ],
            vec![
                product("PR1", "ThermoLink", "Wireless temperature sensor for cold chains"),
                product("PR2", "PressMaster", "Industrial stamping line"),
            ],
            Vec::new(),
        );
        MarketMatchingStage::new(stores.patents, stores.search, advisor, Arc::new(StopWordExtractor))
    }

    #[tokio::test]
    async fn description_matches_overlapping_patents() {
        let stage = stage(Advisor::heuristic());
        let payload = Payload::new().with_str("description", "wireless temperature sensor");
        let outcome = stage.execute(TaskKind::MatchDescription, &payload).await.unwrap();

        let StageOutput::PatentMatches(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.total_matches, 1);
        assert_eq!(report.matches[0].patent_id, "P1");
        assert_eq!(report.matches[0].similarity, 1.0);
        assert_eq!(report.matches[0].evidence, vec!["Keyword overlap: 1.00"]);
        assert_eq!(
            report.matches[0].matched_keywords,
            vec!["sensor", "temperature", "wireless"]
        );
    }

    #[tokio::test]
    async fn advisor_can_rescore_candidates() {
        let mut client = MockLlmClient::new();
        client.expect_complete().returning(|_, _| {
            Ok(r#"{"relevance_score": 0.05, "evidence": ["different field"]}"#.to_string())
        });
        let stage = stage(Advisor::with_client(Arc::new(client), Duration::from_secs(1)));

        let payload = Payload::new().with_str("description", "wireless temperature sensor");
        let outcome = stage.execute(TaskKind::MatchDescription, &payload).await.unwrap();
        let StageOutput::PatentMatches(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert!(report.matches.is_empty());
    }

    #[tokio::test]
    async fn patent_matches_products_with_claims() {
        let stage = stage(Advisor::heuristic());
        let payload = Payload::new().with_str("patent_id", "P1");
        let outcome = stage.execute(TaskKind::FindProductMatches, &payload).await.unwrap();

        assert_eq!(outcome.confidence, 0.85);
        let StageOutput::ProductMatches(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.total_matches, 1);
        let best = &report.matches[0];
        assert_eq!(best.product_id, "PR1");
        assert_eq!(best.matching_claims, vec![1]);
        assert!(best.confidence <= 1.0 && best.confidence >= best.similarity);
    }

    #[tokio::test]
    async fn unknown_patent_fails() {
        let stage = stage(Advisor::heuristic());
        let payload = Payload::new().with_str("patent_id", "NOPE");
        let err = stage
            .execute(TaskKind::FindProductMatches, &payload)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
