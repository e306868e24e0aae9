//! Response synthesis
//!
//! Turns the per-stage records into titled sections and one executive
//! summary. Sections follow a fixed category order; within a category they
//! keep the order their stages ran in.

use crate::executor::ExecutionResults;
use crate::intent::QueryIntent;
use knot_model::RiskLevel;
use knot_stages::StageOutput;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Write as _;

/// Section grouping, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    Fto,
    Corporate,
    Validity,
    Landscape,
    Market,
    Search,
}

/// One titled part of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub category: SectionCategory,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl Section {
    /// Create new section
    #[must_use]
    pub fn new(title: impl Into<String>, category: SectionCategory, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category,
            summary: summary.into(),
            risk_level: None,
            details: Value::Null,
            recommendations: Vec::new(),
        }
    }

    /// With details payload
    #[inline]
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// With risk level
    #[inline]
    #[must_use]
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    /// With recommendations
    #[inline]
    #[must_use]
    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }
}

/// Which pipeline produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orchestration {
    RuleBased,
    Delegated,
}

/// Final answer to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedReport {
    pub query_id: String,
    pub query: String,
    pub intent: QueryIntent,
    pub executive_summary: String,
    pub sections: Vec<Section>,
    pub stage_results: ExecutionResults,
    pub confidence: f64,
    pub orchestration: Orchestration,
}

impl UnifiedReport {
    /// First section of `category`
    #[must_use]
    pub fn section(&self, category: SectionCategory) -> Option<&Section> {
        self.sections.iter().find(|s| s.category == category)
    }
}

fn to_details<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Section for one stage output; `None` for kinds with no report section
fn section_for(output: &StageOutput, has_fto: bool) -> Option<Section> {
    let section = match output {
        StageOutput::Fto(report) => Section::new("Freedom to Operate Analysis", SectionCategory::Fto, &report.summary)
            .with_risk(report.overall_risk)
            .with_details(json!({
                "high_risk_patents": report.high_risk_count,
                "medium_risk_patents": report.medium_risk_count,
                "low_risk_patents": report.low_risk_count,
                "analyses": to_details(&report.analyses),
            }))
            .with_recommendations(report.recommendations.clone()),

        StageOutput::PatentRisk(report) => {
            let summary = format!(
                "Patent {} carries {} risk across {} matching claims.",
                report.patent_id,
                report.overall_risk,
                report.claim_matches.len()
            );
            Section::new("Patent Risk Check", SectionCategory::Fto, summary)
                .with_risk(report.overall_risk)
                .with_details(to_details(report))
        }

        StageOutput::AssigneeResolutions(report) => {
            let parents = report.parent_names();
            let parents = if parents.is_empty() {
                "None identified".to_string()
            } else {
                parents.join(", ")
            };
            let summary = format!(
                "Resolved {} of {} assignees. Ultimate parent companies: {parents}.",
                report.resolved_count, report.total
            );
            Section::new("Corporate Intelligence", SectionCategory::Corporate, summary)
                .with_details(json!({ "resolutions": to_details(&report.resolutions) }))
        }

        StageOutput::ParentResolution(resolution) => {
            let summary = match &resolution.ultimate_parent_name {
                Some(parent) if resolution.resolved => {
                    format!("{} is ultimately owned by {parent}.", resolution.company_name)
                }
                _ => format!("Company '{}' could not be resolved.", resolution.company_name),
            };
            Section::new("Corporate Intelligence", SectionCategory::Corporate, summary)
                .with_details(to_details(resolution))
        }

        StageOutput::OwnershipGraph(graph) => {
            let summary = format!(
                "Ownership graph for {} spans {} companies.",
                graph.company_name,
                graph.nodes.len()
            );
            Section::new("Ownership Structure", SectionCategory::Corporate, summary).with_details(to_details(graph))
        }

        StageOutput::PriorArt(report) => {
            let summary = format!(
                "Found {} prior art candidates for patent {}.",
                report.prior_art_results.len(),
                report.patent_id.as_deref().unwrap_or("N/A")
            );
            Section::new("Prior Art Analysis", SectionCategory::Validity, summary)
                .with_details(json!({ "prior_art": to_details(&report.prior_art_results) }))
        }

        StageOutput::Validity(report) => {
            Section::new("Validity Assessment", SectionCategory::Validity, &report.summary).with_details(to_details(report))
        }

        StageOutput::Landscape(report) => {
            Section::new("Technology Landscape", SectionCategory::Landscape, &report.summary).with_details(to_details(report))
        }

        StageOutput::WhiteSpaces(report) => {
            let summary = format!(
                "Identified {} white spaces across {} clusters.",
                report.white_spaces.len(),
                report.clusters_found
            );
            Section::new("White Space Opportunities", SectionCategory::Landscape, summary).with_details(to_details(report))
        }

        StageOutput::ProductMatches(report) => {
            let summary = format!("Found {} product matches.", report.total_matches);
            Section::new("Product Matching", SectionCategory::Market, summary)
                .with_details(json!({ "matches": to_details(&report.matches) }))
        }

        StageOutput::PatentMatches(report) => {
            let summary = format!("Found {} matching patents.", report.total_matches);
            Section::new("Product Matching", SectionCategory::Market, summary)
                .with_details(json!({ "matches": to_details(&report.matches) }))
        }

        StageOutput::Fetch(report) if !has_fto => {
            let summary = format!("Found {} patents.", report.total_found);
            Section::new("Patent Search Results", SectionCategory::Search, summary)
                .with_details(json!({ "patents": to_details(&report.patents) }))
        }

        _ => return None,
    };
    Some(section)
}

/// Report sections in category order
#[must_use]
pub fn build_sections(results: &ExecutionResults) -> Vec<Section> {
    let has_fto = results.outputs().any(|o| matches!(o, StageOutput::Fto(_)));
    let mut sections: Vec<Section> = results.outputs().filter_map(|o| section_for(o, has_fto)).collect();
    sections.sort_by_key(|s| s.category);
    sections
}

/// Query line followed by one line per section and its recommendations
#[must_use]
pub fn executive_summary(query: &str, sections: &[Section]) -> String {
    let mut text = format!("Analysis for: {query}\n");
    for section in sections {
        let _ = write!(text, "\n- {}: {}", section.title, section.summary);
        for recommendation in &section.recommendations {
            let _ = write!(text, "\n  * {recommendation}");
        }
    }
    text
}

/// Rule-based report over executed stages
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesizer;

impl Synthesizer {
    /// Create new synthesizer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the unified report
    #[must_use]
    pub fn synthesize(&self, intent: &QueryIntent, results: ExecutionResults) -> UnifiedReport {
        let sections = build_sections(&results);
        let report = UnifiedReport {
            query_id: ulid::Ulid::new().to_string(),
            query: intent.raw_query.clone(),
            intent: intent.clone(),
            executive_summary: executive_summary(&intent.raw_query, &sections),
            confidence: results.mean_confidence(),
            sections,
            stage_results: results,
            orchestration: Orchestration::RuleBased,
        };
        tracing::debug!(
            query_id = %report.query_id,
            sections = report.sections.len(),
            confidence = report.confidence,
            "report synthesized"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{StageRecord, StageStatus};
    use crate::intent::IntentParser;
    use knot_stages::stages::corporate::AssigneeReport;
    use knot_stages::stages::ingestion::FetchReport;
    use knot_stages::stages::prior_art::PriorArtReport;
    use knot_stages::{Capability, TaskKind};
    use pretty_assertions::assert_eq;

    fn record(capability: Capability, task: TaskKind, output: StageOutput, confidence: f64) -> StageRecord {
        StageRecord {
            capability,
            task,
            status: StageStatus::Completed,
            output: Some(output),
            confidence,
            error: None,
            elapsed_ms: 0,
        }
    }

    fn fetch(total: usize) -> StageOutput {
        StageOutput::Fetch(FetchReport {
            patents: Vec::new(),
            total_found: total,
            source: "local".into(),
            rate_limited: false,
            retry_after_seconds: None,
            message: None,
        })
    }

    fn prior_art() -> StageOutput {
        StageOutput::PriorArt(PriorArtReport {
            patent_id: None,
            prior_art_results: Vec::new(),
            total_candidates: 0,
        })
    }

    fn assignees() -> StageOutput {
        StageOutput::AssigneeResolutions(AssigneeReport {
            resolutions: Vec::new(),
            total: 2,
            resolved_count: 0,
            resolution_rate: 0.0,
        })
    }

    #[test]
    fn sections_follow_category_order() {
        let mut results = ExecutionResults::new();
        results.insert("prior-art-search", record(Capability::PriorArtSearch, TaskKind::FindPriorArt, prior_art(), 0.5));
        results.insert(
            "corporate-resolution",
            record(Capability::CorporateResolution, TaskKind::ResolveAssignees, assignees(), 0.9),
        );
        let sections = build_sections(&results);

        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Corporate Intelligence", "Prior Art Analysis"]);
        assert_eq!(
            sections[0].summary,
            "Resolved 0 of 2 assignees. Ultimate parent companies: None identified."
        );
        assert_eq!(sections[1].summary, "Found 0 prior art candidates for patent N/A.");
    }

    #[test]
    fn search_section_only_without_fto() {
        let mut results = ExecutionResults::new();
        results.insert("ingestion", record(Capability::Ingestion, TaskKind::FetchPatents, fetch(3), 0.9));
        let sections = build_sections(&results);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].summary, "Found 3 patents.");
    }

    #[test]
    fn executive_summary_lists_sections_and_recommendations() {
        let sections = vec![
            Section::new("Freedom to Operate Analysis", SectionCategory::Fto, "Risky.")
                .with_recommendations(vec!["Consult counsel".into()]),
            Section::new("Patent Search Results", SectionCategory::Search, "Found 1 patents."),
        ];
        assert_eq!(
            executive_summary("q", &sections),
            "Analysis for: q\n\n- Freedom to Operate Analysis: Risky.\n  * Consult counsel\n- Patent Search Results: Found 1 patents."
        );
    }

    #[test]
    fn confidence_is_mean_of_completed_stages() {
        let intent = IntentParser::new().parse("patents about widgets");
        let mut results = ExecutionResults::new();
        results.insert("ingestion", record(Capability::Ingestion, TaskKind::FetchPatents, fetch(0), 0.9));
        results.insert("prior-art-search", record(Capability::PriorArtSearch, TaskKind::FindPriorArt, prior_art(), 0.5));
        results.insert(
            "market-matching",
            StageRecord {
                capability: Capability::MarketMatching,
                task: TaskKind::MatchDescription,
                status: StageStatus::Unavailable,
                output: None,
                confidence: 0.0,
                error: Some("Capability market-matching not available".into()),
                elapsed_ms: 0,
            },
        );
        let report = Synthesizer::new().synthesize(&intent, results);
        assert!((report.confidence - 0.7).abs() < 1e-9);
        assert_eq!(report.orchestration, Orchestration::RuleBased);
        assert_eq!(report.query_id.len(), 26);
        assert!(report.executive_summary.starts_with("Analysis for: patents about widgets\n"));
    }

    #[test]
    fn empty_results_have_zero_confidence() {
        let intent = IntentParser::new().parse("patents about widgets");
        let report = Synthesizer::new().synthesize(&intent, ExecutionResults::new());
        assert_eq!(report.confidence, 0.0);
        assert!(report.sections.is_empty());
        assert_eq!(report.executive_summary, "Analysis for: patents about widgets\n");
    }
}
