//! Keyword-set similarity scoring

use crate::text::{KeywordExtractor, DEFAULT_MAX_KEYWORDS};
use knot_model::RiskLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Scores at or above this band as high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.30;
/// Scores at or above this band as medium risk
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.15;

/// Jaccard index of two sets
///
/// 0.0 when either set is empty, 1.0 for identical non-empty sets.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn set_similarity<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Case-folded keyword set
pub fn keyword_set<I, S>(keywords: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().to_lowercase())
        .collect()
}

/// [`set_similarity`] over case-folded keyword lists
#[must_use]
pub fn keyword_similarity<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    set_similarity(&keyword_set(a), &keyword_set(b))
}

/// Overlap between a claim and a free-text description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlap {
    pub score: f64,
    /// Shared keywords, sorted
    pub matched: Vec<String>,
}

/// Score how much `claim_text` overlaps `description`
#[must_use]
pub fn text_overlap(
    extractor: &dyn KeywordExtractor,
    claim_text: &str,
    description: &str,
) -> TextOverlap {
    let claim = keyword_set(extractor.extract(claim_text, DEFAULT_MAX_KEYWORDS));
    let desc = keyword_set(extractor.extract(description, DEFAULT_MAX_KEYWORDS));
    TextOverlap {
        score: set_similarity(&claim, &desc),
        // BTreeSet iteration is already sorted
        matched: claim.intersection(&desc).cloned().collect(),
    }
}

/// Band a similarity score into a risk level
#[inline]
#[must_use]
pub fn risk_from_score(score: f64) -> RiskLevel {
    if score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::StopWordExtractor;

    #[test]
    fn jaccard_basics() {
        let a = keyword_set(["iot", "sensor", "cloud"]);
        let b = keyword_set(["sensor", "cloud", "edge", "mesh"]);
        assert!((set_similarity(&a, &b) - 0.4).abs() < 1e-12);
        assert_eq!(set_similarity(&a, &a), 1.0);
        assert_eq!(set_similarity(&a, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn keyword_similarity_is_case_folded() {
        assert_eq!(keyword_similarity(&["IoT", "Sensor"], &["iot", "sensor"]), 1.0);
    }

    #[test]
    fn overlap_returns_sorted_matches() {
        let overlap = text_overlap(
            &StopWordExtractor,
            "A wireless temperature sensor transmitting readings to a cloud server",
            "cloud connected temperature sensor",
        );
        assert_eq!(overlap.matched, vec!["cloud", "sensor", "temperature"]);
        assert!(overlap.score > 0.0 && overlap.score <= 1.0);
    }

    #[test]
    fn risk_bands() {
        assert_eq!(risk_from_score(0.5), RiskLevel::High);
        assert_eq!(risk_from_score(0.30), RiskLevel::High);
        assert_eq!(risk_from_score(0.29), RiskLevel::Medium);
        assert_eq!(risk_from_score(0.15), RiskLevel::Medium);
        assert_eq!(risk_from_score(0.149), RiskLevel::Low);
    }
}
