//! Stage payload construction
//!
//! Each task reads a fixed set of keys. Values come from the intent and,
//! for stages that follow others, from the outputs already recorded.

use crate::executor::ExecutionResults;
use crate::intent::QueryIntent;
use crate::plan::PlannedStage;
use knot_stages::stages::fto::FtoReport;
use knot_stages::stages::ingestion::FetchReport;
use knot_stages::{Payload, StageOutput, TaskKind};

fn fto_report(results: &ExecutionResults) -> Option<&FtoReport> {
    results.latest(|output| match output {
        StageOutput::Fto(report) => Some(report),
        _ => None,
    })
}

fn fetch_report(results: &ExecutionResults) -> Option<&FetchReport> {
    results.latest(|output| match output {
        StageOutput::Fetch(report) => Some(report),
        _ => None,
    })
}

/// Patent to focus on: the first high-risk FTO patent, then the first
/// analyzed one, then the first id named in the query
fn focus_patent(intent: &QueryIntent, results: &ExecutionResults) -> Option<String> {
    let fto = fto_report(results);
    fto.and_then(FtoReport::highest_risk_patent)
        .or_else(|| fto.and_then(|r| r.analyses.first()).map(|a| a.patent_id.as_str()))
        .or_else(|| intent.entities.patents.first().map(String::as_str))
        .map(ToString::to_string)
}

fn with_focus(payload: Payload, intent: &QueryIntent, results: &ExecutionResults) -> Payload {
    match focus_patent(intent, results) {
        Some(id) => payload.with_str("patent_id", id),
        None => payload,
    }
}

/// Payload for `stage`
#[must_use]
pub fn build_payload(stage: &PlannedStage, intent: &QueryIntent, results: &ExecutionResults) -> Payload {
    let entities = &intent.entities;
    let keywords = entities.keywords();

    match stage.task {
        TaskKind::FetchPatents | TaskKind::FetchBySource | TaskKind::CheckStatus => Payload::new()
            .with_strings("keywords", keywords)
            .with_strings("jurisdictions", &intent.constraints.jurisdictions)
            .with_strings("patent_ids", &entities.patents)
            .with_str("query", &intent.raw_query),

        TaskKind::AnalyzeFto => Payload::new()
            .with_str("description", intent.description())
            .with_strings("target_markets", &intent.constraints.jurisdictions)
            .with_strings("keywords", keywords),

        TaskKind::CheckPatent | TaskKind::FindProductMatches => {
            with_focus(Payload::new(), intent, results).with_str("description", intent.description())
        }

        TaskKind::ResolveAssignees => {
            let assignees = fto_report(results).map(FtoReport::assignees).unwrap_or_default();
            Payload::new().with_strings("assignees", assignees)
        }

        TaskKind::ResolveParent | TaskKind::OwnershipGraph => {
            let name = entities.companies.first().cloned().unwrap_or_default();
            Payload::new().with_str("company_name", name)
        }

        TaskKind::FindPriorArt | TaskKind::AssessValidity => {
            with_focus(Payload::new(), intent, results).with_strings("keywords", &entities.technologies)
        }

        TaskKind::AnalyzeLandscape => {
            let domain = if entities.technologies.is_empty() {
                intent.raw_query.clone()
            } else {
                entities.technologies.join(" ")
            };
            Payload::new()
                .with_str("domain", domain)
                .with_strings("keywords", keywords)
        }

        TaskKind::FindWhiteSpaces => Payload::new().with_strings("keywords", keywords),

        TaskKind::MatchDescription => Payload::new()
            .with_str("description", intent.description())
            .with_strings("keywords", keywords),

        TaskKind::NormalizePatent | TaskKind::ValidatePatent | TaskKind::ProcessText => {
            with_focus(Payload::new(), intent, results).with_str("text", &intent.raw_query)
        }

        TaskKind::DetectDuplicates | TaskKind::UnifyRecords | TaskKind::ResolveConflict => {
            let fetched: Vec<String> = fetch_report(results)
                .map(|r| r.patents.iter().map(|p| p.id.clone()).collect())
                .unwrap_or_default();
            let payload = Payload::new().with_strings("patent_ids", &fetched);
            match focus_patent(intent, results).or_else(|| fetched.first().cloned()) {
                Some(id) => payload.with_str("patent_id", id),
                None => payload,
            }
        }
    }
}
