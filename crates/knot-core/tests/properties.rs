use knot_core::{ExecutionPlan, Goal, IntentParser, PlannedStage, Planner};
use knot_stages::{Capability, TaskKind};
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    "analyze", "fto", "landscape", "prior art", "who owns", "product", "iot", "cloud", "sensortech",
    "in", "for", "us", "europe", "japan", "US10234567B2", "risk", "the", "of",
];

fn query() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::sample::select(FRAGMENTS), 0..10).prop_map(|words| words.join(" "))
}

fn goal() -> impl Strategy<Value = Goal> {
    prop_oneof![
        Just(Goal::FtoAnalysis),
        Just(Goal::Landscape),
        Just(Goal::Validity),
        Just(Goal::CorporateIntel),
        Just(Goal::ProductMatch),
        Just(Goal::PatentSearch),
    ]
}

proptest! {
    #[test]
    fn prop_parsing_is_deterministic(text in query()) {
        let parser = IntentParser::new();
        prop_assert_eq!(parser.parse(&text), parser.parse(&text));
    }

    #[test]
    fn prop_jurisdictions_are_distinct(text in query()) {
        let intent = IntentParser::new().parse(&text);
        let mut seen = intent.constraints.jurisdictions.clone();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), intent.constraints.jurisdictions.len());
    }

    #[test]
    fn prop_every_query_gets_a_valid_plan(text in query()) {
        let intent = IntentParser::new().parse(&text);
        let plan = Planner::new().plan(&intent).unwrap();
        prop_assert!(!plan.is_empty());
        prop_assert_eq!(plan.goal, intent.primary_goal);
    }

    #[test]
    fn prop_shuffled_templates_run_dependencies_first(goal in goal(), seed in any::<u64>()) {
        let mut stages: Vec<PlannedStage> = Planner::template(goal);
        let len = stages.len();
        if len > 1 {
            stages.rotate_left(usize::try_from(seed % len as u64).unwrap());
        }
        let plan = ExecutionPlan::from_stages(goal, stages).unwrap();
        let ids = plan.stage_ids();
        for (dependency, dependent) in plan.edges() {
            let before = ids.iter().position(|id| *id == dependency).unwrap();
            let after = ids.iter().position(|id| *id == dependent).unwrap();
            prop_assert!(before < after);
        }
    }
}

#[test]
fn fto_template_is_a_diamond() {
    let plan = Planner::new()
        .plan(&IntentParser::new().parse("Analyze FTO for IoT temperature sensor in US"))
        .unwrap();
    assert_eq!(
        plan.edges(),
        vec![
            ("ingestion", "fto-risk-analysis"),
            ("fto-risk-analysis", "corporate-resolution"),
            ("fto-risk-analysis", "prior-art-search"),
        ]
    );
    assert_eq!(plan.stages[0].capability, Capability::Ingestion);
    assert_eq!(plan.stages[3].task, TaskKind::FindPriorArt);
}
