//! Text normalization and keyword extraction

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// Default cap on extracted keywords
pub const DEFAULT_MAX_KEYWORDS: usize = 20;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
        "does", "did", "will", "would", "shall", "should", "may", "might", "can", "could",
        "that", "which", "who", "whom", "this", "these", "those", "it", "its", "not", "no",
        "nor", "as", "if", "then", "than", "so", "such", "said", "each", "every", "any", "all",
        "both", "few", "more", "most", "other", "some", "one", "two", "three", "first",
        "second", "third", "comprising", "comprises", "comprised", "wherein", "thereof",
        "therein", "thereto", "claim", "claims", "according", "includes", "including",
        "method", "system", "device", "apparatus", "means",
    ]
    .into_iter()
    .collect()
});

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static CLAIM_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"claim\s+(\d+)").expect("static regex"));

/// Keyword extraction collaborator
///
/// Implementations must be deterministic: identical input yields an
/// identical, ordered, de-duplicated and case-folded keyword list.
pub trait KeywordExtractor: Send + Sync + fmt::Debug {
    /// Extract at most `max_keywords` keywords from `text`
    fn extract(&self, text: &str, max_keywords: usize) -> Vec<String>;

    /// Extract with the default cap
    fn keywords(&self, text: &str) -> Vec<String> {
        self.extract(text, DEFAULT_MAX_KEYWORDS)
    }
}

/// Stop-word filtering extractor over [`normalize_text`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StopWordExtractor;

impl KeywordExtractor for StopWordExtractor {
    fn extract(&self, text: &str, max_keywords: usize) -> Vec<String> {
        extract_keywords(text, max_keywords)
    }
}

/// Lowercase, replace punctuation with spaces and collapse whitespace
///
/// Word characters and hyphens survive. The result is trimmed and
/// normalizing it again returns it unchanged.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// Extract up to `max_keywords` distinct keywords in order of appearance
///
/// Tokens are stripped of surrounding hyphens, then dropped when they are
/// stop words, two characters or shorter, or purely numeric.
#[must_use]
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let normalized = normalize_text(text);
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for token in normalized.split_whitespace() {
        if keywords.len() >= max_keywords {
            break;
        }
        let word = token.trim_matches('-');
        if word.chars().count() <= 2
            || STOP_WORDS.contains(word)
            || word.chars().all(char::is_numeric)
        {
            continue;
        }
        if seen.insert(word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Claim numbers referenced as "claim N"
#[must_use]
pub fn extract_claim_numbers(text: &str) -> Vec<u32> {
    let lowered = text.to_lowercase();
    CLAIM_REF
        .captures_iter(&lowered)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// `"hi"` when Devanagari characters exceed 10% of the text, else `"en"`
#[must_use]
pub fn detect_language(text: &str) -> &'static str {
    let total = text.chars().count();
    if total == 0 {
        return "en";
    }
    let devanagari = text
        .chars()
        .filter(|c| ('\u{0900}'..='\u{097F}').contains(c))
        .count();
    // integer form of devanagari > total * 0.1
    if devanagari * 10 > total {
        "hi"
    } else {
        "en"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(
            normalize_text("  A Wireless, IoT-based   SENSOR!\n(v2) "),
            "a wireless iot-based sensor v2"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_text("Edge-ML: on-device; calibration...");
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn extract_filters_stop_words_and_short_tokens() {
        let keywords = extract_keywords(
            "A system comprising a temperature sensor and a wireless module, wherein the sensor has 42 probes",
            20,
        );
        assert_eq!(
            keywords,
            vec!["temperature", "sensor", "wireless", "module", "probes"]
        );
    }

    #[test]
    fn extract_strips_edge_hyphens_and_caps_count() {
        let keywords = extract_keywords("-edge- cloud gateway mesh relay", 3);
        assert_eq!(keywords, vec!["edge", "cloud", "gateway"]);
    }

    #[test]
    fn extract_is_deterministic() {
        let text = "IoT temperature monitoring with cloud analytics";
        assert_eq!(
            StopWordExtractor.keywords(text),
            StopWordExtractor.keywords(text)
        );
    }

    #[test]
    fn claim_references() {
        assert_eq!(
            extract_claim_numbers("The sensor of Claim 1, as in claim 12"),
            vec![1, 12]
        );
    }

    #[test]
    fn language_detection() {
        assert_eq!(detect_language(""), "en");
        assert_eq!(detect_language("temperature sensor"), "en");
        assert_eq!(detect_language("तापमान संवेदक"), "hi");
    }
}
