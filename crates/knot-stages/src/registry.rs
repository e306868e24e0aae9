//! Stage registry
//!
//! Maps each [`Capability`] to the stage that serves it. The executor only
//! ever sees `Arc<dyn AnalysisStage>`, so tests can register doubles.

use crate::advisor::Advisor;
use crate::capability::Capability;
use crate::stage::AnalysisStage;
use crate::stages::{
    CorporateResolutionStage, DataQualityStage, FtoRiskStage, IngestionStage, IntegrationStage,
    LandscapeStage, MarketMatchingStage, PriorArtStage,
};
use indexmap::IndexMap;
use knot_analytics::clustering::MERGE_THRESHOLD;
use knot_analytics::{KeywordExtractor, LandscapeClusterer, StopWordExtractor};
use knot_store::RecordStores;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Tunables for the standard stage set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    /// Ingestion fetches admitted per minute
    pub max_requests_per_minute: u32,
    /// Keyword similarity at which landscape clusters merge
    pub merge_threshold: f64,
    /// Probe keywords for heuristic white-space detection
    pub emerging_keywords: Option<Vec<String>>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 60,
            merge_threshold: MERGE_THRESHOLD,
            emerging_keywords: None,
        }
    }
}

/// Capability-indexed set of stages
#[derive(Default, Clone)]
pub struct StageRegistry {
    stages: IndexMap<Capability, Arc<dyn AnalysisStage>>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl StageRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry serving every capability from `stores`
    #[must_use]
    pub fn standard(stores: &RecordStores, advisor: Advisor, settings: &StageSettings) -> Self {
        let extractor: Arc<dyn KeywordExtractor> = Arc::new(StopWordExtractor);
        Self::with_extractor(stores, advisor, settings, extractor)
    }

    /// Standard registry with a custom keyword extractor
    #[must_use]
    pub fn with_extractor(
        stores: &RecordStores,
        advisor: Advisor,
        settings: &StageSettings,
        extractor: Arc<dyn KeywordExtractor>,
    ) -> Self {
        let mut landscape = LandscapeStage::new(stores.patents.clone(), advisor.clone(), extractor.clone())
            .with_clusterer(LandscapeClusterer::new().with_merge_threshold(settings.merge_threshold));
        if let Some(keywords) = &settings.emerging_keywords {
            landscape = landscape.with_emerging_keywords(keywords.clone());
        }

        let mut registry = Self::new();
        registry.register(Arc::new(DataQualityStage::new(stores.patents.clone(), extractor.clone())));
        registry.register(Arc::new(CorporateResolutionStage::new(stores.graph.clone())));
        registry.register(Arc::new(MarketMatchingStage::new(
            stores.patents.clone(),
            stores.search.clone(),
            advisor.clone(),
            extractor.clone(),
        )));
        registry.register(Arc::new(IngestionStage::new(
            stores.patents.clone(),
            settings.max_requests_per_minute,
        )));
        registry.register(Arc::new(IntegrationStage::new(stores.patents.clone())));
        registry.register(Arc::new(landscape));
        registry.register(Arc::new(FtoRiskStage::new(
            stores.patents.clone(),
            advisor.clone(),
            extractor.clone(),
        )));
        registry.register(Arc::new(PriorArtStage::new(
            stores.patents.clone(),
            stores.search.clone(),
            advisor,
            extractor,
        )));
        tracing::debug!(stages = registry.len(), "stage registry built");
        registry
    }

    /// Register a stage under its own capability, replacing any previous one
    pub fn register(&mut self, stage: Arc<dyn AnalysisStage>) -> Option<Arc<dyn AnalysisStage>> {
        self.stages.insert(stage.capability(), stage)
    }

    /// Stage serving `capability`
    #[inline]
    #[must_use]
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn AnalysisStage>> {
        self.stages.get(&capability).cloned()
    }

    /// Check if a capability is served
    #[inline]
    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.stages.contains_key(&capability)
    }

    /// Served capabilities in registration order
    #[must_use]
    pub fn capabilities(&self) -> Vec<Capability> {
        self.stages.keys().copied().collect()
    }

    /// Get number of registered stages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::TaskKind;
    use crate::error::StageError;
    use crate::outcome::StageOutcome;
    use crate::payload::Payload;
    use knot_test_utils::demo_stores;

    #[derive(Debug)]
    struct Fixed;

    #[async_trait::async_trait]
    impl AnalysisStage for Fixed {
        fn capability(&self) -> Capability {
            Capability::Ingestion
        }

        async fn execute(&self, _task: TaskKind, _payload: &Payload) -> Result<StageOutcome, StageError> {
            Err(StageError::not_found("patent", "fixed"))
        }
    }

    #[test]
    fn standard_serves_every_capability() {
        let registry = StageRegistry::standard(&demo_stores(), Advisor::heuristic(), &StageSettings::default());
        assert_eq!(registry.len(), Capability::ALL.len());
        for capability in Capability::ALL {
            let stage = registry.get(capability).unwrap();
            assert_eq!(stage.capability(), capability);
            assert!(capability.tasks().iter().all(|t| stage.supports(*t)));
        }
    }

    #[test]
    fn register_replaces_by_capability() {
        let mut registry = StageRegistry::standard(&demo_stores(), Advisor::heuristic(), &StageSettings::default());
        let previous = registry.register(Arc::new(Fixed));
        assert!(previous.is_some());
        assert_eq!(registry.len(), Capability::ALL.len());
    }

    #[tokio::test]
    async fn registered_double_is_used() {
        let mut registry = StageRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(Fixed));
        let stage = registry.get(Capability::Ingestion).unwrap();
        let err = stage.execute(TaskKind::CheckStatus, &Payload::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!registry.contains(Capability::FtoRiskAnalysis));
    }
}
