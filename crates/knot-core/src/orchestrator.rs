//! Query orchestration
//!
//! Wires parser, planner, executor and synthesizer into one call. A
//! configured delegate gets the first attempt at every query.

use crate::config::KnotConfig;
use crate::delegate::{delegated_report, DelegateOrchestrator};
use crate::error::KnotError;
use crate::executor::StageExecutor;
use crate::intent::{IntentParser, QueryIntent};
use crate::plan::ExecutionPlan;
use crate::planner::Planner;
use crate::synthesis::{Synthesizer, UnifiedReport};
use knot_stages::{Advisor, StageRegistry};
use knot_store::RecordStores;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Error text for an empty query
pub const EMPTY_QUERY_ERROR: &str = "No query provided";
/// Hint returned with [`EMPTY_QUERY_ERROR`]
pub const EMPTY_QUERY_SUGGESTION: &str = "Please provide a natural language query about IP intelligence.";

/// Answer for a query that could not be analyzed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub error: String,
    pub suggestion: String,
    pub confidence: f64,
}

/// Result of [`QueryOrchestrator::answer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Report(Box<UnifiedReport>),
    Suggestion(Suggestion),
}

impl QueryResponse {
    #[must_use]
    pub fn report(&self) -> Option<&UnifiedReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Suggestion(_) => None,
        }
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Report(report) => report.confidence,
            Self::Suggestion(s) => s.confidence,
        }
    }
}

/// Intent and plan without execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub intent: QueryIntent,
    pub plan: ExecutionPlan,
}

/// Advisor selected by the LLM section of `config`
#[cfg(feature = "http")]
#[must_use]
pub fn advisor_for(config: &KnotConfig) -> Advisor {
    use knot_stages::{HttpLlmClient, HttpLlmConfig};

    if !config.llm.enabled {
        return Advisor::heuristic();
    }
    let http = HttpLlmConfig {
        endpoint: config.llm.endpoint.clone(),
        api_key: config.llm.api_key.clone(),
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: config.advisor_timeout(),
    };
    match HttpLlmClient::new(http) {
        Ok(client) => {
            tracing::info!(model = %config.llm.model, "LLM advisor enabled");
            Advisor::with_client(Arc::new(client), config.advisor_timeout())
        }
        Err(err) => {
            tracing::warn!(error = %err, "LLM client unavailable, using heuristics");
            Advisor::heuristic()
        }
    }
}

/// Advisor selected by the LLM section of `config`
#[cfg(not(feature = "http"))]
#[must_use]
pub fn advisor_for(config: &KnotConfig) -> Advisor {
    if config.llm.enabled {
        tracing::warn!("LLM advisor requested but built without the http feature, using heuristics");
    }
    Advisor::heuristic()
}

/// Record stores named by `config`: a dataset directory or the demo set
///
/// # Errors
/// [`KnotError::Store`] when the dataset cannot be loaded.
pub fn stores_for(config: &KnotConfig) -> Result<RecordStores, KnotError> {
    let stores = match &config.data_dir {
        Some(dir) => RecordStores::load_dir(dir)?,
        None => RecordStores::demo()?,
    };
    Ok(stores)
}

/// Natural-language query entry point
pub struct QueryOrchestrator {
    parser: IntentParser,
    planner: Planner,
    executor: StageExecutor,
    synthesizer: Synthesizer,
    delegate: Option<Arc<dyn DelegateOrchestrator>>,
    delegate_enabled: bool,
    delegate_timeout: Duration,
}

impl fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("capabilities", &self.executor.registry().capabilities())
            .field("delegate", &self.delegate.is_some())
            .field("delegate_enabled", &self.delegate_enabled)
            .field("delegate_timeout", &self.delegate_timeout)
            .finish_non_exhaustive()
    }
}

impl QueryOrchestrator {
    /// Create new orchestrator over `registry`
    #[must_use]
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        let defaults = KnotConfig::default();
        Self {
            parser: IntentParser::new(),
            planner: Planner::new(),
            executor: StageExecutor::new(registry).with_stage_timeout(defaults.stage_timeout()),
            synthesizer: Synthesizer::new(),
            delegate: None,
            delegate_enabled: defaults.orchestration.delegate_enabled,
            delegate_timeout: defaults.delegate_timeout(),
        }
    }

    /// Create orchestrator with the standard stages over `stores`
    #[must_use]
    pub fn from_config(config: &KnotConfig, stores: &RecordStores) -> Self {
        let registry = StageRegistry::standard(stores, advisor_for(config), &config.stage_settings());
        let mut orchestrator = Self::new(Arc::new(registry));
        orchestrator.executor = orchestrator.executor.with_stage_timeout(config.stage_timeout());
        orchestrator.delegate_enabled = config.orchestration.delegate_enabled;
        orchestrator.delegate_timeout = config.delegate_timeout();
        orchestrator
    }

    /// With delegate orchestrator
    #[inline]
    #[must_use]
    pub fn with_delegate(mut self, delegate: Arc<dyn DelegateOrchestrator>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// With delegate switched on or off
    #[inline]
    #[must_use]
    pub fn with_delegate_enabled(mut self, enabled: bool) -> Self {
        self.delegate_enabled = enabled;
        self
    }

    /// With bound on one delegate attempt
    #[inline]
    #[must_use]
    pub fn with_delegate_timeout(mut self, timeout: Duration) -> Self {
        self.delegate_timeout = timeout;
        self
    }

    /// With per-stage timeout
    #[inline]
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_stage_timeout(timeout);
        self
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        self.executor.registry()
    }

    /// Intent and plan for `query`, without running anything
    ///
    /// # Errors
    /// [`KnotError::MalformedQuery`] for blank text, [`KnotError::Plan`]
    /// when the plan is invalid.
    pub fn parse(&self, query: &str) -> Result<ParsedQuery, KnotError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(KnotError::MalformedQuery(EMPTY_QUERY_ERROR.to_string()));
        }
        let intent = self.parser.parse(query);
        let plan = self.planner.plan(&intent)?;
        Ok(ParsedQuery { intent, plan })
    }

    /// Answer `query`
    ///
    /// Blank text yields a [`QueryResponse::Suggestion`]. Otherwise the
    /// delegate is tried first, then the rule-based pipeline.
    ///
    /// # Errors
    /// [`KnotError::Plan`] when the rule-based plan is invalid. Stage and
    /// delegate failures are never returned.
    pub async fn answer(&self, query: &str) -> Result<QueryResponse, KnotError> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("empty query");
            return Ok(QueryResponse::Suggestion(Suggestion {
                error: EMPTY_QUERY_ERROR.to_string(),
                suggestion: EMPTY_QUERY_SUGGESTION.to_string(),
                confidence: 0.0,
            }));
        }
        tracing::info!(query = %query, "query received");

        let intent = self.parser.parse(query);
        if let Some(report) = self.try_delegate(&intent).await {
            counter!("knot_queries_total", "orchestration" => "delegated").increment(1);
            return Ok(QueryResponse::Report(Box::new(report)));
        }

        let plan = self.planner.plan(&intent)?;
        let results = self.executor.execute(&plan, &intent).await;
        let report = self.synthesizer.synthesize(&intent, results);
        counter!("knot_queries_total", "orchestration" => "rule_based").increment(1);
        tracing::info!(query_id = %report.query_id, confidence = report.confidence, "query answered");
        Ok(QueryResponse::Report(Box::new(report)))
    }

    async fn try_delegate(&self, intent: &QueryIntent) -> Option<UnifiedReport> {
        let delegate = self.delegate.as_ref().filter(|_| self.delegate_enabled)?;
        let ms = u64::try_from(self.delegate_timeout.as_millis()).unwrap_or(u64::MAX);

        match tokio::time::timeout(self.delegate_timeout, delegate.run(&intent.raw_query)).await {
            Ok(Ok(reply)) if reply.is_usable() => Some(delegated_report(intent, reply)),
            Ok(Ok(_)) => {
                tracing::warn!("delegate returned an empty summary, falling back to rule-based pipeline");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "delegate failed, falling back to rule-based pipeline");
                None
            }
            Err(_) => {
                tracing::warn!(error = %KnotError::Timeout { ms }, "delegate timed out, falling back to rule-based pipeline");
                None
            }
        }
    }
}
