//! Goal-to-plan templates

use crate::error::PlanError;
use crate::intent::{Goal, QueryIntent};
use crate::plan::{ExecutionPlan, PlannedStage};
use knot_stages::{Capability, TaskKind};

/// Maps a goal to its fixed stage template
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    /// Create new planner
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Stage template for `goal`, in template order
    #[must_use]
    pub fn template(goal: Goal) -> Vec<PlannedStage> {
        use Capability as C;
        use TaskKind as T;

        match goal {
            Goal::FtoAnalysis => {
                let fetch = PlannedStage::new(C::Ingestion, T::FetchPatents);
                let fto = PlannedStage::new(C::FtoRiskAnalysis, T::AnalyzeFto).after(fetch.id.clone());
                let assignees =
                    PlannedStage::new(C::CorporateResolution, T::ResolveAssignees).after(fto.id.clone());
                let prior_art = PlannedStage::new(C::PriorArtSearch, T::FindPriorArt).after(fto.id.clone());
                vec![fetch, fto, assignees, prior_art]
            }
            Goal::Landscape => vec![PlannedStage::new(C::LandscapeAnalysis, T::AnalyzeLandscape)],
            Goal::Validity => vec![PlannedStage::new(C::PriorArtSearch, T::FindPriorArt)],
            Goal::CorporateIntel => vec![PlannedStage::new(C::CorporateResolution, T::ResolveParent)],
            Goal::ProductMatch => vec![PlannedStage::new(C::MarketMatching, T::MatchDescription)],
            Goal::PatentSearch => vec![PlannedStage::new(C::Ingestion, T::FetchPatents)],
        }
    }

    /// Plan for `intent`
    ///
    /// # Errors
    /// [`PlanError`] if a template is malformed.
    pub fn plan(&self, intent: &QueryIntent) -> Result<ExecutionPlan, PlanError> {
        let plan = ExecutionPlan::from_stages(intent.primary_goal, Self::template(intent.primary_goal))?;
        tracing::debug!(goal = %plan.goal, stages = ?plan.stage_ids(), "plan built");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentParser;
    use pretty_assertions::assert_eq;

    const GOALS: [Goal; 6] = [
        Goal::FtoAnalysis,
        Goal::Landscape,
        Goal::Validity,
        Goal::CorporateIntel,
        Goal::ProductMatch,
        Goal::PatentSearch,
    ];

    #[test]
    fn every_template_is_a_valid_plan() {
        for goal in GOALS {
            let plan = ExecutionPlan::from_stages(goal, Planner::template(goal)).unwrap();
            let template: Vec<String> = Planner::template(goal).into_iter().map(|s| s.id).collect();
            assert_eq!(plan.stage_ids(), template);
        }
    }

    #[test]
    fn fto_plan_order() {
        let intent = IntentParser::new().parse("Analyze FTO for IoT temperature sensor in US");
        let plan = Planner::new().plan(&intent).unwrap();
        assert_eq!(
            plan.stage_ids(),
            vec!["ingestion", "fto-risk-analysis", "corporate-resolution", "prior-art-search"]
        );
        assert_eq!(plan.stages[2].task, TaskKind::ResolveAssignees);
    }

    #[test]
    fn single_stage_goals() {
        let corporate = Planner::new()
            .plan(&IntentParser::new().parse("Who owns SensorTech?"))
            .unwrap();
        assert_eq!(corporate.stage_ids(), vec!["corporate-resolution"]);
        assert_eq!(corporate.stages[0].task, TaskKind::ResolveParent);

        let search = Planner::new().plan(&IntentParser::new().parse("patents about widgets")).unwrap();
        assert_eq!(search.stage_ids(), vec!["ingestion"]);
    }
}
