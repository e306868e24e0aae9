//! Execution plans
//!
//! A plan is a DAG of stages. Construction validates the declared
//! dependencies and fixes the run order with Kahn's algorithm, breaking
//! ties by template position: an unedited template keeps its literal
//! order, and an edited one still runs every dependency first.

use crate::error::PlanError;
use crate::intent::Goal;
use knot_stages::{Capability, TaskKind};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStage {
    pub id: String,
    pub capability: Capability,
    pub task: TaskKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl PlannedStage {
    /// Create new stage identified by its capability id
    #[must_use]
    pub fn new(capability: Capability, task: TaskKind) -> Self {
        Self {
            id: capability.id().to_string(),
            capability,
            task,
            depends_on: Vec::new(),
        }
    }

    /// With explicit id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// With dependency on stage `id`
    #[inline]
    #[must_use]
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }
}

/// Validated, ordered stage list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub goal: Goal,
    /// Stages in run order
    pub stages: Vec<PlannedStage>,
}

impl ExecutionPlan {
    /// Validate `stages` and order them
    ///
    /// # Errors
    /// [`PlanError`] for duplicate ids, unknown dependencies, tasks the
    /// capability does not handle, and dependency cycles.
    pub fn from_stages(goal: Goal, stages: Vec<PlannedStage>) -> Result<Self, PlanError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(stages.len(), stages.len());
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(stages.len());

        for (position, stage) in stages.iter().enumerate() {
            if !stage.capability.tasks().contains(&stage.task) {
                return Err(PlanError::TaskMismatch {
                    stage: stage.id.clone(),
                    capability: stage.capability,
                    task: stage.task.to_string(),
                });
            }
            let node = graph.add_node(position);
            if nodes.insert(stage.id.as_str(), node).is_some() {
                return Err(PlanError::DuplicateStage(stage.id.clone()));
            }
        }

        for stage in &stages {
            let to = nodes[stage.id.as_str()];
            for dependency in &stage.depends_on {
                let from = *nodes.get(dependency.as_str()).ok_or_else(|| PlanError::UnknownDependency {
                    stage: stage.id.clone(),
                    dependency: dependency.clone(),
                })?;
                graph.update_edge(from, to, ());
            }
        }

        let order = stable_topological_order(&graph)
            .map_err(|position| PlanError::CyclicDependency(stages[position].id.clone()))?;

        let mut slots: Vec<Option<PlannedStage>> = stages.into_iter().map(Some).collect();
        let stages = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(Self { goal, stages })
    }

    /// Stage ids in run order
    #[must_use]
    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.id.as_str()).collect()
    }

    /// Dependency edges as `(dependency, dependent)` pairs
    #[must_use]
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.stages
            .iter()
            .flat_map(|s| s.depends_on.iter().map(move |d| (d.as_str(), s.id.as_str())))
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Kahn's algorithm, always releasing the ready node with the lowest
/// template position
///
/// Returns template positions in run order, or the position of a stage
/// left on a cycle.
fn stable_topological_order(graph: &DiGraph<usize, ()>) -> Result<Vec<usize>, usize> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(|n| Reverse((graph[n], n.index())))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse((position, index))) = ready.pop() {
        order.push(position);
        for next in graph.neighbors_directed(NodeIndex::new(index), Direction::Outgoing) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse((graph[next], next.index())));
            }
        }
    }

    if order.len() == graph.node_count() {
        Ok(order)
    } else {
        let stuck = graph
            .node_indices()
            .find(|n| in_degree[n.index()] > 0)
            .map_or(0, |n| graph[n]);
        Err(stuck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fetch() -> PlannedStage {
        PlannedStage::new(Capability::Ingestion, TaskKind::FetchPatents)
    }

    fn fto() -> PlannedStage {
        PlannedStage::new(Capability::FtoRiskAnalysis, TaskKind::AnalyzeFto)
    }

    fn prior_art() -> PlannedStage {
        PlannedStage::new(Capability::PriorArtSearch, TaskKind::FindPriorArt)
    }

    #[test]
    fn literal_order_is_kept_when_valid() {
        let plan = ExecutionPlan::from_stages(
            Goal::FtoAnalysis,
            vec![fetch(), fto().after("ingestion"), prior_art().after("fto-risk-analysis")],
        )
        .unwrap();
        assert_eq!(plan.stage_ids(), vec!["ingestion", "fto-risk-analysis", "prior-art-search"]);
        assert_eq!(
            plan.edges(),
            vec![("ingestion", "fto-risk-analysis"), ("fto-risk-analysis", "prior-art-search")]
        );
    }

    #[test]
    fn dependencies_run_first_even_when_listed_later() {
        let plan = ExecutionPlan::from_stages(
            Goal::FtoAnalysis,
            vec![prior_art().after("fto-risk-analysis"), fto().after("ingestion"), fetch()],
        )
        .unwrap();
        assert_eq!(plan.stage_ids(), vec!["ingestion", "fto-risk-analysis", "prior-art-search"]);
    }

    #[test]
    fn independent_stages_keep_template_order() {
        let plan = ExecutionPlan::from_stages(Goal::PatentSearch, vec![prior_art(), fetch(), fto()]).unwrap();
        assert_eq!(plan.stage_ids(), vec!["prior-art-search", "ingestion", "fto-risk-analysis"]);
    }

    #[test]
    fn rejects_invalid_plans() {
        let duplicate = ExecutionPlan::from_stages(Goal::PatentSearch, vec![fetch(), fetch()]);
        assert_eq!(duplicate.unwrap_err(), PlanError::DuplicateStage("ingestion".into()));

        let unknown = ExecutionPlan::from_stages(Goal::FtoAnalysis, vec![fto().after("ingestion")]);
        assert!(matches!(unknown, Err(PlanError::UnknownDependency { .. })));

        let cyclic = ExecutionPlan::from_stages(
            Goal::FtoAnalysis,
            vec![fetch().after("fto-risk-analysis"), fto().after("ingestion")],
        );
        assert!(matches!(cyclic, Err(PlanError::CyclicDependency(_))));

        let mismatch = ExecutionPlan::from_stages(
            Goal::PatentSearch,
            vec![PlannedStage::new(Capability::Ingestion, TaskKind::AnalyzeFto)],
        );
        assert!(matches!(mismatch, Err(PlanError::TaskMismatch { .. })));
    }

    #[test]
    fn same_capability_twice_with_explicit_ids() {
        let plan = ExecutionPlan::from_stages(
            Goal::PatentSearch,
            vec![fetch(), fetch().with_id("ingestion-2").after("ingestion")],
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
    }
}
