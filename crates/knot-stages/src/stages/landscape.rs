//! Landscape analysis: clustering, white spaces and ranked opportunities

use super::truncate;
use crate::advisor::Advisor;
use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use knot_analytics::clustering::MAX_SUGGESTED_KEYWORDS;
use knot_analytics::{
    find_white_spaces, keyword_set, Cluster, KeywordExtractor, LandscapeClusterer, WhiteSpace,
    WhiteSpaceKind,
};
use knot_store::PatentStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Probe keywords for emerging areas, added to the keyword universe when
/// white spaces are detected heuristically
pub const DEFAULT_EMERGING_KEYWORDS: [&str; 6] = [
    "underwater-iot",
    "quantum-sensing",
    "5g-sensor",
    "ai-calibration",
    "edge-ml",
    "digital-twin-sensor",
];

const LABEL_PROMPT: &str = "You are a patent landscape analyst. Given the keywords of a patent \
cluster, produce a short human-readable label and a one-sentence description. Return ONLY valid \
JSON: {\"label\": \"...\", \"description\": \"...\"}";

const WHITE_SPACE_PROMPT: &str = "You are a technology strategist. Given a technology domain \
and its existing patent clusters, identify 2-4 innovation white spaces that no cluster covers. \
Return ONLY a JSON array: [{\"description\": \"...\", \"opportunity_score\": 0.0-1.0, \
\"keywords\": [\"...\"]}]";

/// How crowded the area around an opportunity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitiveIntensity {
    Low,
    Medium,
    High,
}

impl CompetitiveIntensity {
    /// High opportunity scores mean little competition
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::Low
        } else if score > 0.4 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// A white space with its rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOpportunity {
    pub white_space: WhiteSpace,
    /// 1-based
    pub rank: usize,
    pub rationale: String,
    pub competitive_intensity: CompetitiveIntensity,
}

/// Full landscape of a technology domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeReport {
    pub domain: String,
    pub clusters: Vec<Cluster>,
    pub white_spaces: Vec<WhiteSpace>,
    pub opportunities: Vec<RankedOpportunity>,
    pub total_patents_analyzed: usize,
    pub summary: String,
}

/// White spaces only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhiteSpaceReport {
    pub white_spaces: Vec<WhiteSpace>,
    pub patents_analyzed: usize,
    pub clusters_found: usize,
}

#[derive(Debug, Deserialize)]
struct LabelReply {
    label: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhiteSpaceReply {
    #[serde(default)]
    description: String,
    opportunity_score: Option<f64>,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ClusterDigest<'a> {
    label: &'a str,
    keywords: &'a [String],
}

/// Maps a technology domain into clusters and opportunities
#[derive(Debug, Clone)]
pub struct LandscapeStage {
    patents: Arc<PatentStore>,
    advisor: Advisor,
    extractor: Arc<dyn KeywordExtractor>,
    clusterer: LandscapeClusterer,
    emerging: Vec<String>,
}

impl LandscapeStage {
    /// Create new stage with the default clusterer and emerging probes
    #[must_use]
    pub fn new(patents: Arc<PatentStore>, advisor: Advisor, extractor: Arc<dyn KeywordExtractor>) -> Self {
        Self {
            patents,
            advisor,
            extractor,
            clusterer: LandscapeClusterer::new(),
            emerging: DEFAULT_EMERGING_KEYWORDS.iter().map(ToString::to_string).collect(),
        }
    }

    /// With clusterer
    #[inline]
    #[must_use]
    pub fn with_clusterer(mut self, clusterer: LandscapeClusterer) -> Self {
        self.clusterer = clusterer;
        self
    }

    /// With emerging-area probe keywords
    #[inline]
    #[must_use]
    pub fn with_emerging_keywords(mut self, keywords: Vec<String>) -> Self {
        self.emerging = keywords;
        self
    }

    async fn label_clusters(&self, clusters: &mut [Cluster]) {
        if !self.advisor.is_enabled() {
            return;
        }
        for cluster in clusters.iter_mut() {
            let prompt = format!(
                "Cluster keywords: {}\nPatent IDs in cluster: {}",
                cluster.keywords.iter().take(15).cloned().collect::<Vec<_>>().join(", "),
                cluster.patent_ids.iter().take(10).cloned().collect::<Vec<_>>().join(", "),
            );
            if let Some(reply) = self.advisor.consult_json::<LabelReply>(LABEL_PROMPT, &prompt).await {
                if let Some(label) = reply.label.filter(|l| !l.trim().is_empty()) {
                    cluster.label = label;
                }
                cluster.description = reply.description.or(cluster.description.take());
            }
        }
    }

    async fn advised_white_spaces(&self, domain: &str, clusters: &[Cluster]) -> Vec<WhiteSpace> {
        if !self.advisor.is_enabled() {
            return Vec::new();
        }
        let digest: Vec<ClusterDigest<'_>> = clusters
            .iter()
            .map(|c| ClusterDigest {
                label: &c.label,
                keywords: &c.keywords[..c.keywords.len().min(10)],
            })
            .collect();
        let Ok(digest) = serde_json::to_string(&digest) else {
            return Vec::new();
        };
        let prompt = format!("Domain: {domain}\n\nExisting clusters:\n{digest}");

        self.advisor
            .consult_json::<Vec<WhiteSpaceReply>>(WHITE_SPACE_PROMPT, &prompt)
            .await
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, ws)| WhiteSpace {
                id: format!("WS{:03}", i + 1),
                kind: WhiteSpaceKind::Advised,
                description: ws.description,
                keywords: ws.keywords.into_iter().take(MAX_SUGGESTED_KEYWORDS).collect(),
                adjacent_clusters: Vec::new(),
                opportunity_score: ws.opportunity_score.unwrap_or(0.5).clamp(0.0, 1.0),
            })
            .collect()
    }

    async fn analyze_landscape(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let domain = payload.str("domain").unwrap_or_default().to_string();
        let mut keywords = payload.strings("keywords")?;
        if keywords.is_empty() {
            keywords = self.extractor.keywords(&domain);
        }

        let mut patents = self.patents.search_by_keywords(&keywords, &[]);
        if patents.is_empty() {
            tracing::debug!(domain = %domain, "no keyword hits, widening landscape to all patents");
            patents = self.patents.get_all();
        }

        let mut clusters = self.clusterer.cluster(&patents);
        self.label_clusters(&mut clusters).await;

        let mut universe: BTreeSet<String> = keyword_set(&keywords);
        universe.extend(patents.iter().flat_map(|p| keyword_set(&p.keywords)));

        let mut white_spaces = self.advised_white_spaces(&domain, &clusters).await;
        if white_spaces.is_empty() {
            universe.extend(keyword_set(&self.emerging));
            white_spaces = find_white_spaces(&clusters, &universe);
        }

        let mut ranked: Vec<&WhiteSpace> = white_spaces.iter().collect();
        ranked.sort_by(|a, b| b.opportunity_score.total_cmp(&a.opportunity_score));
        let opportunities = ranked
            .into_iter()
            .enumerate()
            .map(|(i, ws)| RankedOpportunity {
                rank: i + 1,
                rationale: format!(
                    "Opportunity in {} with score {:.2}",
                    truncate(&ws.description, 50),
                    ws.opportunity_score
                ),
                competitive_intensity: CompetitiveIntensity::from_score(ws.opportunity_score),
                white_space: ws.clone(),
            })
            .collect();

        let summary = format!(
            "Analyzed {} patents in {}. Found {} clusters and {} white spaces.",
            patents.len(),
            domain,
            clusters.len(),
            white_spaces.len()
        );
        let report = LandscapeReport {
            domain,
            clusters,
            white_spaces,
            opportunities,
            total_patents_analyzed: patents.len(),
            summary,
        };
        Ok(StageOutcome::new(StageOutput::Landscape(report), 0.85))
    }

    fn find_white_spaces(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let keywords = payload.strings("keywords")?;
        let patents = self.patents.search_by_keywords(&keywords, &[]);
        let clusters = self.clusterer.cluster(&patents);

        let mut universe = keyword_set(&keywords);
        universe.extend(patents.iter().flat_map(|p| keyword_set(&p.keywords)));

        let report = WhiteSpaceReport {
            white_spaces: find_white_spaces(&clusters, &universe),
            patents_analyzed: patents.len(),
            clusters_found: clusters.len(),
        };
        Ok(StageOutcome::new(StageOutput::WhiteSpaces(report), 0.8))
    }
}

#[async_trait::async_trait]
impl AnalysisStage for LandscapeStage {
    fn capability(&self) -> Capability {
        Capability::LandscapeAnalysis
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::AnalyzeLandscape => self.analyze_landscape(payload).await,
            TaskKind::FindWhiteSpaces => self.find_white_spaces(payload),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}
