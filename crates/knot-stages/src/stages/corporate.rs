//! Corporate resolution: ultimate parents, assignees and ownership graphs

use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::stage::{unsupported, AnalysisStage};
use knot_analytics::{AssigneeResolution, OwnershipResolver};
use knot_model::CompanyType;
use knot_store::GraphStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ultimate-parent lookup for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentResolution {
    pub resolved: bool,
    /// Canonical name when resolved, otherwise the name or id asked for
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_type: Option<CompanyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimate_parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimate_parent_name: Option<String>,
    /// Every company below the ultimate parent
    #[serde(default)]
    pub subsidiaries: Vec<String>,
    /// Patents held by the parent and all its subsidiaries
    #[serde(default)]
    pub patent_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParentResolution {
    fn not_found(query: &str) -> Self {
        Self {
            resolved: false,
            company_name: query.to_string(),
            company_id: None,
            company_type: None,
            ultimate_parent_id: None,
            ultimate_parent_name: None,
            subsidiaries: Vec::new(),
            patent_ids: Vec::new(),
            error: Some("Company not found".to_string()),
        }
    }
}

/// Batch assignee resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeReport {
    pub resolutions: Vec<AssigneeResolution>,
    pub total: usize,
    pub resolved_count: usize,
    pub resolution_rate: f64,
}

impl AssigneeReport {
    /// Distinct resolved ultimate-parent names, first-seen order
    #[must_use]
    pub fn parent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.resolutions.iter().filter_map(|r| r.ultimate_parent_name.as_ref()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Node of an ownership graph report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub company_type: CompanyType,
    pub jurisdiction: String,
    pub patent_count: usize,
}

/// Edge of an ownership graph report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub ownership_percentage: f64,
    pub source: String,
}

/// Connected ownership neighbourhood of a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipGraphReport {
    pub company_id: String,
    pub company_name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Resolves companies and assignees through the ownership graph
#[derive(Debug, Clone)]
pub struct CorporateResolutionStage {
    graph: Arc<GraphStore>,
}

impl CorporateResolutionStage {
    /// Create new stage
    #[inline]
    #[must_use]
    pub fn new(graph: Arc<GraphStore>) -> Self {
        Self { graph }
    }

    fn resolver(&self) -> OwnershipResolver<'_, GraphStore> {
        OwnershipResolver::new(self.graph.as_ref())
    }

    fn resolve_parent(&self, payload: &Payload) -> StageOutcome {
        let company = match payload.str("company_id") {
            Some(id) => self.graph.get_company(id),
            None => payload
                .str("company_name")
                .and_then(|name| self.graph.find_company_by_name(name)),
        };
        let Some(company) = company else {
            let query = payload
                .str("company_name")
                .or_else(|| payload.str("company_id"))
                .unwrap_or_default();
            tracing::debug!(company = %query, "company not found");
            let report = ParentResolution::not_found(query);
            return StageOutcome::new(StageOutput::ParentResolution(report), 0.0);
        };

        let resolver = self.resolver();
        let parent_id = resolver.ultimate_parent(&company.id);
        let parent = self.graph.get_company(&parent_id);
        let subsidiaries = resolver.all_subsidiaries(&parent_id);

        let patent_ids = std::iter::once(&parent_id)
            .chain(&subsidiaries)
            .filter_map(|id| self.graph.get_company(id))
            .flat_map(|c| c.patent_ids)
            .collect();

        let report = ParentResolution {
            resolved: true,
            company_name: company.name,
            company_id: Some(company.id),
            company_type: Some(company.company_type),
            ultimate_parent_name: parent.map(|p| p.name),
            ultimate_parent_id: Some(parent_id),
            subsidiaries,
            patent_ids,
            error: None,
        };
        StageOutcome::new(StageOutput::ParentResolution(report), 0.95)
    }

    #[allow(clippy::cast_precision_loss)]
    fn resolve_assignees(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let assignees = payload.strings("assignees")?;
        let resolver = self.resolver();
        let resolutions: Vec<AssigneeResolution> = assignees
            .iter()
            .map(|name| resolver.resolve_assignee(name))
            .collect();

        let resolved_count = resolutions.iter().filter(|r| r.resolved).count();
        let resolution_rate = resolved_count as f64 / assignees.len().max(1) as f64;
        let report = AssigneeReport {
            total: assignees.len(),
            resolved_count,
            resolution_rate,
            resolutions,
        };
        Ok(StageOutcome::new(
            StageOutput::AssigneeResolutions(report),
            resolution_rate,
        ))
    }

    fn ownership_graph(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        let company = match payload.str("company_id") {
            Some(id) => self
                .graph
                .get_company(id)
                .ok_or_else(|| StageError::not_found("company", id))?,
            None => {
                let name = payload.require_str("company_name")?;
                self.graph
                    .find_company_by_name(name)
                    .ok_or_else(|| StageError::not_found("company", name))?
            }
        };

        let subgraph = self.resolver().ownership_subgraph(&company.id);
        let report = OwnershipGraphReport {
            company_id: company.id,
            company_name: company.name,
            nodes: subgraph
                .nodes
                .into_iter()
                .map(|n| GraphNode {
                    patent_count: n.patent_ids.len(),
                    id: n.id,
                    name: n.name,
                    company_type: n.company_type,
                    jurisdiction: n.jurisdiction,
                })
                .collect(),
            edges: subgraph
                .edges
                .into_iter()
                .map(|e| GraphEdge {
                    from: e.parent_id,
                    to: e.child_id,
                    ownership_percentage: e.percentage,
                    source: e.source,
                })
                .collect(),
        };
        Ok(StageOutcome::new(StageOutput::OwnershipGraph(report), 0.95))
    }
}

#[async_trait::async_trait]
impl AnalysisStage for CorporateResolutionStage {
    fn capability(&self) -> Capability {
        Capability::CorporateResolution
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::ResolveParent => Ok(self.resolve_parent(payload)),
            TaskKind::ResolveAssignees => self.resolve_assignees(payload),
            TaskKind::OwnershipGraph => self.ownership_graph(payload),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knot_test_utils::{chain_graph, cyclic_graph, demo_stores};
    use pretty_assertions::assert_eq;

    async fn run(stage: &CorporateResolutionStage, task: TaskKind, payload: Payload) -> StageOutcome {
        stage.execute(task, &payload).await.unwrap()
    }

    #[tokio::test]
    async fn sensortech_resolves_to_techglobal() {
        let stage = CorporateResolutionStage::new(demo_stores().graph);
        let outcome = run(
            &stage,
            TaskKind::ResolveParent,
            Payload::new().with_str("company_name", "SensorTech"),
        )
        .await;

        assert_eq!(outcome.confidence, 0.95);
        let StageOutput::ParentResolution(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert!(report.resolved);
        assert_eq!(report.company_name, "SensorTech Inc");
        assert_eq!(report.ultimate_parent_name.as_deref(), Some("TechGlobal Corp"));
        assert!(report.subsidiaries.contains(&"COMP002".to_string()));
    }

    #[tokio::test]
    async fn chain_parent_collects_family() {
        let stage = CorporateResolutionStage::new(Arc::new(chain_graph()));
        let outcome = run(
            &stage,
            TaskKind::ResolveParent,
            Payload::new().with_str("company_id", "SUB2"),
        )
        .await;
        let StageOutput::ParentResolution(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.ultimate_parent_id.as_deref(), Some("PARENT"));
        assert_eq!(report.subsidiaries, vec!["SUB1", "SUB2"]);
    }

    #[tokio::test]
    async fn cyclic_parent_terminates() {
        let stage = CorporateResolutionStage::new(Arc::new(cyclic_graph()));
        let outcome = run(
            &stage,
            TaskKind::ResolveParent,
            Payload::new().with_str("company_id", "A"),
        )
        .await;
        let StageOutput::ParentResolution(report) = outcome.output else {
            panic!("unexpected output");
        };
        let parent = report.ultimate_parent_id.unwrap();
        assert!(parent == "A" || parent == "B");
    }

    #[tokio::test]
    async fn unknown_company_is_unresolved_with_zero_confidence() {
        let stage = CorporateResolutionStage::new(Arc::new(chain_graph()));
        let outcome = run(
            &stage,
            TaskKind::ResolveParent,
            Payload::new().with_str("company_name", "Nobody Ltd"),
        )
        .await;
        assert_eq!(outcome.confidence, 0.0);
        let StageOutput::ParentResolution(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert!(!report.resolved);
        assert_eq!(report.company_name, "Nobody Ltd");
    }

    #[tokio::test]
    async fn assignee_rate_is_confidence() {
        let stage = CorporateResolutionStage::new(demo_stores().graph);
        let outcome = run(
            &stage,
            TaskKind::ResolveAssignees,
            Payload::new().with_strings("assignees", ["SensorTech Inc", "Unknown Widgets"]),
        )
        .await;
        assert_eq!(outcome.confidence, 0.5);
        let StageOutput::AssigneeResolutions(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!((report.total, report.resolved_count), (2, 1));
        assert_eq!(report.parent_names(), vec!["TechGlobal Corp"]);
    }

    #[tokio::test]
    async fn no_assignees_means_zero_confidence() {
        let stage = CorporateResolutionStage::new(demo_stores().graph);
        let outcome = run(&stage, TaskKind::ResolveAssignees, Payload::new()).await;
        assert_eq!(outcome.confidence, 0.0);
    }

    #[tokio::test]
    async fn ownership_graph_of_chain() {
        let stage = CorporateResolutionStage::new(Arc::new(chain_graph()));
        let outcome = run(
            &stage,
            TaskKind::OwnershipGraph,
            Payload::new().with_str("company_id", "SUB1"),
        )
        .await;
        let StageOutput::OwnershipGraph(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.nodes.len(), 3);
        assert_eq!(report.edges.len(), 2);

        let err = stage
            .execute(TaskKind::OwnershipGraph, &Payload::new().with_str("company_id", "NOPE"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn ownership_graph_by_name() {
        let stage = CorporateResolutionStage::new(demo_stores().graph);
        let outcome = run(
            &stage,
            TaskKind::OwnershipGraph,
            Payload::new().with_str("company_name", "sensortech"),
        )
        .await;
        let StageOutput::OwnershipGraph(report) = outcome.output else {
            panic!("unexpected output");
        };
        assert_eq!(report.company_name, "SensorTech Inc");
    }
}
