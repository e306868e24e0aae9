//! Query intent parsing
//!
//! A fixed-grammar classifier over the lower-cased query. Given the same
//! text and vocabulary tables it always produces the same intent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    FtoAnalysis,
    Landscape,
    Validity,
    CorporateIntel,
    ProductMatch,
    PatentSearch,
}

impl Goal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FtoAnalysis => "fto_analysis",
            Self::Landscape => "landscape",
            Self::Validity => "validity",
            Self::CorporateIntel => "corporate_intel",
            Self::ProductMatch => "product_match",
            Self::PatentSearch => "patent_search",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal triggers, checked in order; the first category with a matching
/// term wins
const GOAL_TERMS: [(Goal, &[&str]); 5] = [
    (
        Goal::FtoAnalysis,
        &["fto", "freedom to operate", "infringement", "infringe", "risk", "commercializ"],
    ),
    (
        Goal::Landscape,
        &["landscape", "white space", "whitespace", "opportunity", "gap", "trend"],
    ),
    (
        Goal::Validity,
        &["prior art", "validity", "invalidate", "challenge", "novel"],
    ),
    (
        Goal::CorporateIntel,
        &["parent company", "ownership", "subsidiary", "shell company", "who owns", "corporate"],
    ),
    (
        Goal::ProductMatch,
        &["product", "match", "link", "commercial", "market"],
    ),
];

const TECHNOLOGY_TERMS: [&str; 18] = [
    "iot",
    "internet of things",
    "temperature sensor",
    "temperature monitoring",
    "wireless sensor",
    "sensor network",
    "cloud",
    "analytics",
    "machine learning",
    "edge computing",
    "bluetooth",
    "underwater",
    "energy harvesting",
    "predictive maintenance",
    "digital twin",
    "cold chain",
    "environmental monitoring",
    "hvac",
];

const COMPANY_TERMS: [&str; 7] = [
    "techglobal",
    "sensortech",
    "techshield",
    "datavault",
    "eurosense",
    "oceantech",
    "agrisense",
];

/// Jurisdiction synonyms in match order
const JURISDICTION_TERMS: [(&str, &str); 14] = [
    ("us", "US"),
    ("united states", "US"),
    ("usa", "US"),
    ("america", "US"),
    ("eu", "EU"),
    ("europe", "EU"),
    ("european", "EU"),
    ("india", "IN"),
    ("indian", "IN"),
    ("china", "CN"),
    ("chinese", "CN"),
    ("japan", "JP"),
    ("japanese", "JP"),
    ("pct", "WO"),
];

/// Fallback technology fragments have between one and this many words
const MAX_FRAGMENT_WORDS: usize = 4;

static PREPOSITIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:for|in|of|about|regarding|on)\b").expect("static regex"));
static PATENT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:US|EP|IN|CN|JP|WO)\d+[A-Z]?\d*\b").expect("static regex"));

/// Named entities in query order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    pub technologies: Vec<String>,
    pub products: Vec<String>,
    pub companies: Vec<String>,
    pub patents: Vec<String>,
}

impl Entities {
    /// Technologies followed by products
    #[must_use]
    pub fn keywords(&self) -> Vec<String> {
        self.technologies
            .iter()
            .chain(&self.products)
            .cloned()
            .collect()
    }
}

/// Restrictions on the analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Jurisdiction codes, de-duplicated in first-mention order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jurisdictions: Vec<String>,
}

/// Structured reading of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub primary_goal: Goal,
    pub entities: Entities,
    pub constraints: Constraints,
    pub raw_query: String,
}

impl QueryIntent {
    /// Joined technologies and products, or the raw query when both are empty
    #[must_use]
    pub fn description(&self) -> String {
        let joined = self.entities.keywords().join(" ");
        if joined.is_empty() {
            self.raw_query.clone()
        } else {
            joined
        }
    }
}

/// Substring containment, as the vocabulary tables are written for
fn contains_term(text: &str, term: &str) -> bool {
    text.contains(term)
}

/// Whole-word containment, so short codes such as `us` or `eu` do not fire
/// inside longer words
fn contains_word(text: &str, term: &str) -> bool {
    text.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Rule-based intent parser
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentParser;

impl IntentParser {
    /// Create new parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `query` into an intent
    #[must_use]
    pub fn parse(&self, query: &str) -> QueryIntent {
        let lowered = query.to_lowercase();
        let intent = QueryIntent {
            primary_goal: self.detect_goal(&lowered),
            entities: self.extract_entities(query, &lowered),
            constraints: self.extract_constraints(&lowered),
            raw_query: query.to_string(),
        };
        tracing::debug!(
            goal = %intent.primary_goal,
            technologies = ?intent.entities.technologies,
            jurisdictions = ?intent.constraints.jurisdictions,
            "query parsed"
        );
        intent
    }

    /// First goal category with a term in `lowered`
    #[must_use]
    pub fn detect_goal(&self, lowered: &str) -> Goal {
        GOAL_TERMS
            .iter()
            .find(|(_, terms)| terms.iter().any(|t| contains_term(lowered, t)))
            .map_or(Goal::PatentSearch, |(goal, _)| *goal)
    }

    fn extract_entities(&self, query: &str, lowered: &str) -> Entities {
        let mut technologies: Vec<String> = TECHNOLOGY_TERMS
            .iter()
            .filter(|t| contains_term(lowered, t))
            .map(ToString::to_string)
            .collect();

        if technologies.is_empty() {
            technologies = PREPOSITIONS
                .split(lowered)
                .map(str::trim)
                .filter(|fragment| {
                    let words = fragment.split_whitespace().count();
                    (1..=MAX_FRAGMENT_WORDS).contains(&words)
                })
                .map(ToString::to_string)
                .collect();
        }

        let upper = query.to_uppercase();
        let patents = PATENT_ID
            .find_iter(&upper)
            .map(|m| m.as_str().to_string())
            .collect();

        let companies = COMPANY_TERMS
            .iter()
            .filter(|c| contains_term(lowered, c))
            .map(ToString::to_string)
            .collect();

        Entities {
            technologies,
            products: Vec::new(),
            companies,
            patents,
        }
    }

    fn extract_constraints(&self, lowered: &str) -> Constraints {
        let mut jurisdictions: Vec<String> = Vec::new();
        for (term, code) in JURISDICTION_TERMS {
            if contains_word(lowered, term) && !jurisdictions.iter().any(|j| j == code) {
                jurisdictions.push(code.to_string());
            }
        }
        Constraints { jurisdictions }
    }
}
