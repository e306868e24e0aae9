//! Domain analysis stages, one module per capability

pub mod corporate;
pub mod data_quality;
pub mod fto;
pub mod ingestion;
pub mod integration;
pub mod landscape;
pub mod market;
pub mod prior_art;

pub use corporate::CorporateResolutionStage;
pub use data_quality::DataQualityStage;
pub use fto::FtoRiskStage;
pub use ingestion::IngestionStage;
pub use integration::IntegrationStage;
pub use landscape::LandscapeStage;
pub use market::MarketMatchingStage;
pub use prior_art::PriorArtStage;

/// First `max` characters of `text`, never splitting a character
pub(crate) fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Descending by score, stable for equal scores
pub(crate) fn by_score_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.total_cmp(&a)
}
