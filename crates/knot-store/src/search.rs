//! Product and prior-art store

use indexmap::IndexMap;
use knot_analytics::keyword_set;
use knot_model::{PriorArtCandidate, ProductInfo};
use parking_lot::RwLock;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
struct SearchInner {
    products: IndexMap<String, ProductInfo>,
    prior_art: IndexMap<String, PriorArtCandidate>,
}

/// Products and prior-art disclosures
#[derive(Debug, Default)]
pub struct SearchStore {
    inner: RwLock<SearchInner>,
}

fn mentions(terms: &BTreeSet<String>, keywords: &[String], text: &str) -> bool {
    keyword_set(keywords).intersection(terms).next().is_some()
        || text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .any(|w| terms.contains(w))
}

impl SearchStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product
    pub fn add_product(&self, product: ProductInfo) {
        self.inner.write().products.insert(product.id.clone(), product);
    }

    /// Product by id
    #[must_use]
    pub fn get_product(&self, id: &str) -> Option<ProductInfo> {
        self.inner.read().products.get(id).cloned()
    }

    /// Every product in insertion order
    #[must_use]
    pub fn all_products(&self) -> Vec<ProductInfo> {
        self.inner.read().products.values().cloned().collect()
    }

    /// Products whose keywords, name or description mention any keyword
    #[must_use]
    pub fn search_products<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<ProductInfo> {
        let terms = keyword_set(keywords);
        self.inner
            .read()
            .products
            .values()
            .filter(|p| mentions(&terms, &p.keywords, &format!("{} {}", p.name, p.description)))
            .cloned()
            .collect()
    }

    /// Insert or replace a prior-art candidate
    pub fn add_prior_art(&self, candidate: PriorArtCandidate) {
        self.inner
            .write()
            .prior_art
            .insert(candidate.id.clone(), candidate);
    }

    /// Prior-art candidate by id
    #[must_use]
    pub fn get_prior_art(&self, id: &str) -> Option<PriorArtCandidate> {
        self.inner.read().prior_art.get(id).cloned()
    }

    /// Every prior-art candidate in insertion order
    #[must_use]
    pub fn all_prior_art(&self) -> Vec<PriorArtCandidate> {
        self.inner.read().prior_art.values().cloned().collect()
    }

    /// Prior art whose keywords, title or text mention any keyword
    #[must_use]
    pub fn search_prior_art<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<PriorArtCandidate> {
        let terms = keyword_set(keywords);
        self.inner
            .read()
            .prior_art
            .values()
            .filter(|c| mentions(&terms, &c.keywords, &format!("{} {}", c.title, c.text)))
            .cloned()
            .collect()
    }

    /// Number of products
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.inner.read().products.len()
    }

    /// Number of prior-art candidates
    #[must_use]
    pub fn prior_art_count(&self) -> usize {
        self.inner.read().prior_art.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_art_search_matches_keywords_and_text() {
        let store = SearchStore::new();
        store.add_prior_art(
            PriorArtCandidate::new("PA1", "Thermal probe networks").with_keywords(["thermal"]),
        );
        store.add_prior_art(
            PriorArtCandidate::new("PA2", "Ledger design").with_text("A wireless gateway for meters"),
        );

        let ids: Vec<_> = store
            .search_prior_art(&["Thermal", "gateway"])
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["PA1", "PA2"]);
        assert!(store.search_prior_art(&["quantum"]).is_empty());
    }

    #[test]
    fn product_search() {
        let store = SearchStore::new();
        store.add_product(
            ProductInfo::new("PROD1", "ColdTrack").with_description("Cold chain temperature logger"),
        );
        assert_eq!(store.search_products(&["logger"]).len(), 1);
        assert_eq!(store.product_count(), 1);
        assert!(store.get_product("PROD1").is_some());
    }
}
