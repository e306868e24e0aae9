//! Ingestion: simulated registry fetches over the patent store
//!
//! Every fetch passes through a per-minute [`RateLimiter`]. An exhausted
//! window produces a `rate_limited` report, not an error, so the rest of a
//! plan still runs.

use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::{StageOutcome, StageOutput};
use crate::payload::Payload;
use crate::rate_limit::RateLimiter;
use crate::stage::{unsupported, AnalysisStage};
use knot_model::{Patent, PatentStatus};
use knot_store::PatentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registries the simulated connector can reach
pub const SOURCES: [&str; 3] = ["USPTO", "EPO", "CGPDTM"];

const DEFAULT_SOURCE: &str = "USPTO";
const CONNECTOR: &str = "mock_api";

/// Compact patent listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentSummary {
    pub id: String,
    pub title: String,
    pub source: String,
    pub publication_number: String,
    pub assignees: Vec<String>,
    pub status: PatentStatus,
    pub jurisdictions: Vec<String>,
}

impl From<Patent> for PatentSummary {
    fn from(p: Patent) -> Self {
        Self {
            id: p.id,
            title: p.title,
            source: p.source,
            publication_number: p.publication_number,
            assignees: p.assignees,
            status: p.status,
            jurisdictions: p.jurisdictions,
        }
    }
}

/// Result of a fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub patents: Vec<PatentSummary>,
    pub total_found: usize,
    pub source: String,
    pub rate_limited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Connector health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub status: String,
    pub request_count: u64,
    pub rate_limit: u32,
    pub sources_available: Vec<String>,
}

/// Fetches patents as if from remote registries
#[derive(Debug)]
pub struct IngestionStage {
    patents: Arc<PatentStore>,
    limiter: RateLimiter,
}

impl IngestionStage {
    /// Create new stage admitting `max_requests_per_minute` fetches
    #[must_use]
    pub fn new(patents: Arc<PatentStore>, max_requests_per_minute: u32) -> Self {
        Self {
            patents,
            limiter: RateLimiter::new(max_requests_per_minute),
        }
    }

    fn rate_limited(&self, source: &str) -> StageOutcome {
        let retry_after = self.limiter.retry_after_secs();
        tracing::warn!(retry_after, "ingestion rate limit exceeded");
        let report = FetchReport {
            patents: Vec::new(),
            total_found: 0,
            source: source.to_string(),
            rate_limited: true,
            retry_after_seconds: Some(retry_after),
            message: Some("Rate limit exceeded. Simulating backoff.".to_string()),
        };
        StageOutcome::new(StageOutput::Fetch(report), 0.5)
    }

    fn fetch_patents(&self, payload: &Payload) -> Result<StageOutcome, StageError> {
        if !self.limiter.try_acquire() {
            return Ok(self.rate_limited(CONNECTOR));
        }
        let keywords = payload.strings("keywords")?;
        let jurisdictions = payload.strings("jurisdictions")?;
        let patent_ids = payload.strings("patent_ids")?;

        // Direct references first, then keyword hits
        let mut found: Vec<Patent> = patent_ids
            .iter()
            .filter_map(|reference| self.patents.find(reference))
            .collect();
        let mut hits = self.patents.search_by_keywords(&keywords, &jurisdictions);
        if hits.is_empty() {
            if let Some(query) = payload.str("query") {
                hits = self.patents.search(query, &jurisdictions);
            }
        }
        for patent in hits {
            if !found.iter().any(|p| p.id == patent.id) {
                found.push(patent);
            }
        }

        tracing::debug!(found = found.len(), "patents fetched");
        let report = FetchReport {
            total_found: found.len(),
            patents: found.into_iter().map(PatentSummary::from).collect(),
            source: CONNECTOR.to_string(),
            rate_limited: false,
            retry_after_seconds: None,
            message: None,
        };
        Ok(StageOutcome::new(StageOutput::Fetch(report), 0.9))
    }

    fn fetch_by_source(&self, payload: &Payload) -> StageOutcome {
        let source = payload.str("source").unwrap_or(DEFAULT_SOURCE);
        if !self.limiter.try_acquire() {
            return self.rate_limited(source);
        }
        let found = self.patents.get_by_source(source);
        let report = FetchReport {
            total_found: found.len(),
            patents: found.into_iter().map(PatentSummary::from).collect(),
            source: source.to_string(),
            rate_limited: false,
            retry_after_seconds: None,
            message: None,
        };
        StageOutcome::new(StageOutput::Fetch(report), 0.95)
    }

    fn check_status(&self) -> StageOutcome {
        let report = IngestionStatus {
            status: "operational".to_string(),
            request_count: self.limiter.total_requests(),
            rate_limit: self.limiter.limit(),
            sources_available: SOURCES.iter().map(ToString::to_string).collect(),
        };
        StageOutcome::new(StageOutput::IngestionStatus(report), 1.0)
    }
}

#[async_trait::async_trait]
impl AnalysisStage for IngestionStage {
    fn capability(&self) -> Capability {
        Capability::Ingestion
    }

    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError> {
        match task {
            TaskKind::FetchPatents => self.fetch_patents(payload),
            TaskKind::FetchBySource => Ok(self.fetch_by_source(payload)),
            TaskKind::CheckStatus => Ok(self.check_status()),
            other => Err(unsupported(self.capability(), other)),
        }
    }
}
