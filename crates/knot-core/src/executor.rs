//! Stage execution
//!
//! Runs a plan strictly one stage at a time. Every stage gets a payload
//! built from the intent and the records of earlier stages, and every
//! outcome, including failures, lands in that stage's own record. Each
//! stage runs on its own task, so not even a panic aborts the rest of the
//! plan.

use crate::intent::QueryIntent;
use crate::payloads::build_payload;
use crate::plan::{ExecutionPlan, PlannedStage};
use indexmap::IndexMap;
use knot_stages::{Capability, StageError, StageOutput, StageRegistry, TaskKind};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::Instrument;

/// Default bound on one stage
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
    /// No stage registered for the capability
    Unavailable,
}

impl StageStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Result slot of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub capability: Capability,
    pub task: TaskKind,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<StageOutput>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl StageRecord {
    fn failed(stage: &PlannedStage, status: StageStatus, error: String, elapsed_ms: u64) -> Self {
        Self {
            capability: stage.capability,
            task: stage.task,
            status,
            output: None,
            confidence: 0.0,
            error: Some(error),
            elapsed_ms,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }
}

/// Stage records keyed by stage id, in run order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionResults {
    records: IndexMap<String, StageRecord>,
}

impl ExecutionResults {
    /// Create empty results
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stage_id: impl Into<String>, record: StageRecord) {
        self.records.insert(stage_id.into(), record);
    }

    #[inline]
    #[must_use]
    pub fn get(&self, stage_id: &str) -> Option<&StageRecord> {
        self.records.get(stage_id)
    }

    /// Records in run order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageRecord)> {
        self.records.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Outputs of completed stages, in run order
    pub fn outputs(&self) -> impl Iterator<Item = &StageOutput> {
        self.records.values().filter_map(|r| r.output.as_ref())
    }

    /// Latest output `pick` accepts
    pub fn latest<'a, T, F>(&'a self, pick: F) -> Option<&'a T>
    where
        F: Fn(&'a StageOutput) -> Option<&'a T>,
    {
        self.records
            .values()
            .rev()
            .filter_map(|r| r.output.as_ref())
            .find_map(pick)
    }

    /// Mean confidence of completed stages, 0 when none completed
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_confidence(&self) -> f64 {
        let scores: Vec<f64> = self
            .records
            .values()
            .filter(|r| r.is_completed())
            .map(|r| r.confidence)
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return "stage cancelled".to_string();
    }
    let panic = err.into_panic();
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("stage panicked: {detail}")
}

/// Sequential plan executor
#[derive(Debug, Clone)]
pub struct StageExecutor {
    registry: Arc<StageRegistry>,
    stage_timeout: Duration,
}

impl StageExecutor {
    /// Create new executor over `registry`
    #[must_use]
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        Self {
            registry,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// With per-stage timeout
    #[inline]
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Run every stage of `plan` in order
    pub async fn execute(&self, plan: &ExecutionPlan, intent: &QueryIntent) -> ExecutionResults {
        let mut results = ExecutionResults::new();
        for stage in &plan.stages {
            let span = tracing::info_span!("stage", id = %stage.id, capability = %stage.capability, task = %stage.task);
            let record = self.run_stage(stage, intent, &results).instrument(span).await;

            counter!(
                "knot_stage_executions_total",
                "capability" => stage.capability.id(),
                "status" => record.status.as_str()
            )
            .increment(1);
            #[allow(clippy::cast_precision_loss)]
            let elapsed = record.elapsed_ms as f64;
            histogram!("knot_stage_duration_ms", "capability" => stage.capability.id()).record(elapsed);

            results.insert(stage.id.clone(), record);
        }
        results
    }

    async fn run_stage(&self, stage: &PlannedStage, intent: &QueryIntent, results: &ExecutionResults) -> StageRecord {
        let start = Instant::now();
        let Some(handler) = self.registry.get(stage.capability) else {
            tracing::warn!("capability not registered");
            let error = format!("Capability {} not available", stage.capability);
            return StageRecord::failed(stage, StageStatus::Unavailable, error, 0);
        };

        let payload = build_payload(stage, intent, results);
        let task = stage.task;
        tracing::debug!("stage started");
        let mut handle = tokio::spawn(async move { handler.execute(task, &payload).await }.in_current_span());
        let outcome = tokio::time::timeout(self.stage_timeout, &mut handle).await;
        let elapsed = elapsed_ms(start);

        match outcome {
            Ok(Ok(Ok(outcome))) => {
                tracing::info!(confidence = outcome.confidence, elapsed_ms = elapsed, output = outcome.output.kind(), "stage finished");
                StageRecord {
                    capability: stage.capability,
                    task: stage.task,
                    status: StageStatus::Completed,
                    output: Some(outcome.output),
                    confidence: outcome.confidence,
                    error: None,
                    elapsed_ms: elapsed,
                }
            }
            Ok(Ok(Err(err))) => {
                tracing::warn!(error = %err, not_found = err.is_not_found(), "stage failed");
                StageRecord::failed(stage, StageStatus::Failed, err.to_string(), elapsed)
            }
            Ok(Err(join)) => {
                let error = join_failure(join);
                tracing::error!(error = %error, "stage aborted");
                StageRecord::failed(stage, StageStatus::Failed, error, elapsed)
            }
            Err(_) => {
                handle.abort();
                let err = StageError::Timeout {
                    ms: u64::try_from(self.stage_timeout.as_millis()).unwrap_or(u64::MAX),
                };
                tracing::warn!(error = %err, "stage timed out");
                StageRecord::failed(stage, StageStatus::Failed, err.to_string(), elapsed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentParser;
    use crate::planner::Planner;
    use knot_stages::{Advisor, AnalysisStage, Payload, StageOutcome, StageSettings};
    use knot_test_utils::demo_stores;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Broken;

    #[async_trait::async_trait]
    impl AnalysisStage for Broken {
        fn capability(&self) -> Capability {
            Capability::Ingestion
        }

        async fn execute(&self, _task: TaskKind, _payload: &Payload) -> Result<StageOutcome, StageError> {
            Err(StageError::not_found("patent", "missing"))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait::async_trait]
    impl AnalysisStage for Panicking {
        fn capability(&self) -> Capability {
            Capability::FtoRiskAnalysis
        }

        async fn execute(&self, _task: TaskKind, _payload: &Payload) -> Result<StageOutcome, StageError> {
            panic!("claim table corrupted")
        }
    }

    #[derive(Debug)]
    struct Stalled;

    #[async_trait::async_trait]
    impl AnalysisStage for Stalled {
        fn capability(&self) -> Capability {
            Capability::Ingestion
        }

        async fn execute(&self, _task: TaskKind, _payload: &Payload) -> Result<StageOutcome, StageError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(StageError::not_found("patent", "late"))
        }
    }

    fn standard() -> StageRegistry {
        StageRegistry::standard(&demo_stores(), Advisor::heuristic(), &StageSettings::default())
    }

    fn fto_intent() -> QueryIntent {
        IntentParser::new().parse("Analyze FTO for IoT temperature sensor in US")
    }

    #[tokio::test]
    async fn runs_every_stage_in_plan_order() {
        let intent = fto_intent();
        let plan = Planner::new().plan(&intent).unwrap();
        let results = StageExecutor::new(Arc::new(standard())).execute(&plan, &intent).await;

        let ids: Vec<&str> = results.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, plan.stage_ids());
        assert!(results.iter().all(|(_, r)| r.is_completed()));
        assert!(results.mean_confidence() > 0.0);
    }

    #[tokio::test]
    async fn failed_stage_does_not_abort_the_plan() {
        let mut registry = standard();
        registry.register(Arc::new(Broken));
        let intent = fto_intent();
        let plan = Planner::new().plan(&intent).unwrap();
        let results = StageExecutor::new(Arc::new(registry)).execute(&plan, &intent).await;

        let ingestion = results.get("ingestion").unwrap();
        assert_eq!(ingestion.status, StageStatus::Failed);
        assert_eq!(ingestion.confidence, 0.0);
        assert_eq!(ingestion.error.as_deref(), Some("patent not found: missing"));
        assert!(results.get("fto-risk-analysis").unwrap().is_completed());
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn panicking_stage_is_recorded_as_failed() {
        let mut registry = standard();
        registry.register(Arc::new(Panicking));
        let intent = fto_intent();
        let plan = Planner::new().plan(&intent).unwrap();
        let results = StageExecutor::new(Arc::new(registry)).execute(&plan, &intent).await;

        assert_eq!(results.len(), 4);
        let fto = results.get("fto-risk-analysis").unwrap();
        assert_eq!(fto.status, StageStatus::Failed);
        assert_eq!(fto.error.as_deref(), Some("stage panicked: claim table corrupted"));
        assert!(results.get("ingestion").unwrap().is_completed());
        assert!(results.get("corporate-resolution").unwrap().is_completed());
        assert!(results.get("prior-art-search").unwrap().is_completed());
    }

    #[tokio::test]
    async fn missing_capability_is_recorded_inline() {
        let intent = fto_intent();
        let plan = Planner::new().plan(&intent).unwrap();
        let results = StageExecutor::new(Arc::new(StageRegistry::new())).execute(&plan, &intent).await;

        assert_eq!(results.len(), 4);
        let record = results.get("fto-risk-analysis").unwrap();
        assert_eq!(record.status, StageStatus::Unavailable);
        assert_eq!(record.error.as_deref(), Some("Capability fto-risk-analysis not available"));
        assert_eq!(results.mean_confidence(), 0.0);
    }

    #[tokio::test]
    async fn slow_stage_times_out() {
        let mut registry = StageRegistry::new();
        registry.register(Arc::new(Stalled));
        let intent = IntentParser::new().parse("patents about widgets");
        let plan = Planner::new().plan(&intent).unwrap();
        let executor = StageExecutor::new(Arc::new(registry)).with_stage_timeout(Duration::from_millis(20));
        let results = executor.execute(&plan, &intent).await;

        let record = results.get("ingestion").unwrap();
        assert_eq!(record.status, StageStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("stage timed out after 20ms"));
    }
}
