//! Delegate orchestrator seam
//!
//! A delegate may answer a whole query in place of the rule-based
//! pipeline, typically an agentic model calling stage tools itself. Its
//! reply is mapped onto the same report shape; the caller falls back to
//! the rule-based pipeline when the delegate fails or says nothing.

use crate::error::KnotError;
use crate::executor::ExecutionResults;
use crate::intent::QueryIntent;
use crate::synthesis::{Orchestration, Section, SectionCategory, UnifiedReport};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confidence when no tool result reports one
const UNSCORED_CONFIDENCE: f64 = 0.5;

/// Full-query orchestrator used ahead of the rule-based pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DelegateOrchestrator: Send + Sync {
    /// Answer `query`
    ///
    /// # Errors
    /// Any failure; the caller logs it and falls back.
    async fn run(&self, query: &str) -> Result<DelegateReply, KnotError>;
}

/// Delegate answer: final summary plus the latest result of each tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelegateReply {
    pub executive_summary: String,
    /// Tool name to its JSON result, in call order
    #[serde(default)]
    pub tool_results: IndexMap<String, Value>,
}

impl DelegateReply {
    /// Check whether the reply carries a usable summary
    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.executive_summary.trim().is_empty()
    }
}

/// Section title and category for a delegate tool
fn tool_section(tool: &str) -> Option<(&'static str, SectionCategory)> {
    let mapped = match tool {
        "analyze_fto" => ("FTO Risk Analysis", SectionCategory::Fto),
        "check_patent_risk" => ("Patent Risk Detail", SectionCategory::Fto),
        "analyze_landscape" => ("Landscape Analysis", SectionCategory::Landscape),
        "find_white_spaces" => ("White Space Opportunities", SectionCategory::Landscape),
        "find_prior_art" => ("Prior Art Search", SectionCategory::Validity),
        "validate_patent" => ("Validity Assessment", SectionCategory::Validity),
        "match_patent_to_products" => ("Patent-Product Matches", SectionCategory::Market),
        "find_product_matches" => ("Product Matches", SectionCategory::Market),
        "resolve_parent_company" => ("Corporate Ownership", SectionCategory::Corporate),
        "get_ownership_graph" => ("Ownership Graph", SectionCategory::Corporate),
        "resolve_assignees" => ("Assignee Resolution", SectionCategory::Corporate),
        "search_patents" => ("Patent Search Results", SectionCategory::Search),
        _ => return None,
    };
    Some(mapped)
}

/// Mean of the `confidence_score` fields tool results report
#[allow(clippy::cast_precision_loss)]
fn estimate_confidence(tool_results: &IndexMap<String, Value>) -> f64 {
    if tool_results.is_empty() {
        return 0.0;
    }
    let scores: Vec<f64> = tool_results
        .values()
        .filter_map(|v| v.get("confidence_score").and_then(Value::as_f64))
        .collect();
    if scores.is_empty() {
        UNSCORED_CONFIDENCE
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Report for a usable delegate reply
#[must_use]
pub fn delegated_report(intent: &QueryIntent, reply: DelegateReply) -> UnifiedReport {
    let confidence = estimate_confidence(&reply.tool_results);
    let sections = reply
        .tool_results
        .into_iter()
        .filter_map(|(tool, data)| {
            let (title, category) = tool_section(&tool)?;
            let summary = data
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(Section::new(title, category, summary).with_details(data))
        })
        .collect();

    UnifiedReport {
        query_id: ulid::Ulid::new().to_string(),
        query: intent.raw_query.clone(),
        intent: intent.clone(),
        executive_summary: reply.executive_summary.trim().to_string(),
        sections,
        stage_results: ExecutionResults::new(),
        confidence,
        orchestration: Orchestration::Delegated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentParser;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reply(tools: Vec<(&str, Value)>) -> DelegateReply {
        DelegateReply {
            executive_summary: "  Moderate risk overall.  ".into(),
            tool_results: tools.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    #[test]
    fn known_tools_become_sections() {
        let intent = IntentParser::new().parse("Analyze FTO for IoT temperature sensor in US");
        let report = delegated_report(
            &intent,
            reply(vec![
                ("analyze_fto", json!({"summary": "3 patents at risk", "confidence_score": 0.9})),
                ("scratchpad", json!({"notes": "ignored"})),
                ("resolve_assignees", json!({"confidence_score": 0.7})),
            ]),
        );

        let titles: Vec<&str> = report.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["FTO Risk Analysis", "Assignee Resolution"]);
        assert_eq!(report.sections[0].summary, "3 patents at risk");
        assert_eq!(report.sections[1].category, SectionCategory::Corporate);
        assert_eq!(report.executive_summary, "Moderate risk overall.");
        assert_eq!(report.orchestration, Orchestration::Delegated);
        assert!((report.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn confidence_without_scores() {
        assert_eq!(estimate_confidence(&IndexMap::new()), 0.0);
        let unscored = reply(vec![("search_patents", json!({"patents": []}))]);
        assert_eq!(estimate_confidence(&unscored.tool_results), UNSCORED_CONFIDENCE);
    }

    #[test]
    fn blank_summary_is_not_usable() {
        assert!(!DelegateReply::default().is_usable());
        assert!(reply(Vec::new()).is_usable());
    }
}
