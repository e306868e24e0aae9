//! Patent store

use crate::error::StoreError;
use indexmap::IndexMap;
use knot_analytics::{extract_keywords, keyword_set, DEFAULT_MAX_KEYWORDS};
use knot_model::Patent;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Normalized text produced by the data-quality stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Claim number paired with its normalized text
    pub claims: Vec<(u32, String)>,
}

/// In-memory patent records keyed by id, in insertion order
///
/// Reads hand out clones. The only write after loading is
/// [`PatentStore::apply_normalization`], serialized by the write lock.
#[derive(Debug, Default)]
pub struct PatentStore {
    patents: RwLock<IndexMap<String, Patent>>,
}

impl PatentStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a patent
    pub fn insert(&self, patent: Patent) {
        self.patents.write().insert(patent.id.clone(), patent);
    }

    /// Patent by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Patent> {
        self.patents.read().get(id).cloned()
    }

    /// Patent by id or publication number, or a not-found error
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when neither matches.
    pub fn require(&self, reference: &str) -> Result<Patent, StoreError> {
        self.find(reference)
            .ok_or_else(|| StoreError::not_found("patent", reference))
    }

    /// Every patent in insertion order
    #[must_use]
    pub fn get_all(&self) -> Vec<Patent> {
        self.patents.read().values().cloned().collect()
    }

    /// Patent by publication number, case-insensitive
    #[must_use]
    pub fn get_by_publication_number(&self, number: &str) -> Option<Patent> {
        self.patents
            .read()
            .values()
            .find(|p| p.publication_number.eq_ignore_ascii_case(number))
            .cloned()
    }

    /// Patent by internal id or publication number
    #[must_use]
    pub fn find(&self, reference: &str) -> Option<Patent> {
        self.get(reference)
            .or_else(|| self.get_by_publication_number(reference))
    }

    /// Patents sharing at least one keyword with `keywords`
    ///
    /// Comparison is case-insensitive against each patent's keyword list.
    /// A non-empty `jurisdictions` list further requires overlap with the
    /// patent's jurisdictions.
    #[must_use]
    pub fn search_by_keywords<S: AsRef<str>>(&self, keywords: &[S], jurisdictions: &[String]) -> Vec<Patent> {
        let wanted = keyword_set(keywords);
        if wanted.is_empty() {
            return Vec::new();
        }
        self.patents
            .read()
            .values()
            .filter(|p| keyword_set(&p.keywords).intersection(&wanted).next().is_some())
            .filter(|p| p.covers_any(jurisdictions))
            .cloned()
            .collect()
    }

    /// Free-text search over title, abstract and keywords
    ///
    /// The query is reduced to its extracted keywords. A patent matches
    /// when any of them appears as a title or abstract word or as one of
    /// its keywords.
    #[must_use]
    pub fn search(&self, query: &str, jurisdictions: &[String]) -> Vec<Patent> {
        let terms = keyword_set(extract_keywords(query, DEFAULT_MAX_KEYWORDS));
        if terms.is_empty() {
            return Vec::new();
        }
        self.patents
            .read()
            .values()
            .filter(|p| {
                let text = format!("{} {}", p.title, p.abstract_text).to_lowercase();
                text.split_whitespace().any(|w| terms.contains(w))
                    || keyword_set(&p.keywords).intersection(&terms).next().is_some()
            })
            .filter(|p| p.covers_any(jurisdictions))
            .cloned()
            .collect()
    }

    /// Patents with any classification code starting with `prefix`
    #[must_use]
    pub fn search_by_classification(&self, prefix: &str) -> Vec<Patent> {
        self.patents
            .read()
            .values()
            .filter(|p| p.classifications.iter().any(|c| c.code.starts_with(prefix)))
            .cloned()
            .collect()
    }

    /// Patents whose assignee names contain `assignee`, case-insensitive
    #[must_use]
    pub fn get_by_assignee(&self, assignee: &str) -> Vec<Patent> {
        let needle = assignee.to_lowercase();
        self.patents
            .read()
            .values()
            .filter(|p| p.assignees.iter().any(|a| a.to_lowercase().contains(&needle)))
            .cloned()
            .collect()
    }

    /// Patents registered by one source registry
    #[must_use]
    pub fn get_by_source(&self, source: &str) -> Vec<Patent> {
        self.patents
            .read()
            .values()
            .filter(|p| p.source.eq_ignore_ascii_case(source))
            .cloned()
            .collect()
    }

    /// Number of stored patents
    #[must_use]
    pub fn count(&self) -> usize {
        self.patents.read().len()
    }

    /// Write normalized text back onto a stored patent
    ///
    /// Claims absent from `normalization` keep their previous value.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the id is unknown.
    pub fn apply_normalization(&self, id: &str, normalization: Normalization) -> Result<(), StoreError> {
        let mut patents = self.patents.write();
        let patent = patents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("patent", id))?;

        patent.normalized_title = Some(normalization.title);
        patent.normalized_abstract = Some(normalization.abstract_text);
        for (number, text) in normalization.claims {
            if let Some(claim) = patent.claims.iter_mut().find(|c| c.number == number) {
                claim.normalized_text = Some(text);
            }
        }
        tracing::debug!(patent = %id, "normalization written back");
        Ok(())
    }
}
