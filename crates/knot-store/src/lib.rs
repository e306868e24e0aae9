//! KNOT Store - in-memory record stores
//!
//! Stores are populated once at load time and shared behind `Arc`s.
//! Every read returns an owned snapshot; the patent store's normalization
//! write-back is the only mutation after loading.
//!
//! # Example
//!
//! ```rust,ignore
//! use knot_store::RecordStores;
//!
//! let stores = RecordStores::demo()?;
//! let sensortech = stores.graph.find_company_by_name("SensorTech");
//! println!("{} patents loaded", stores.patents.count());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod dataset;
pub mod error;
pub mod graph;
pub mod patents;
pub mod search;

pub use dataset::{derive_ownership_edges, Dataset};
pub use error::StoreError;
pub use graph::GraphStore;
pub use patents::{Normalization, PatentStore};
pub use search::SearchStore;

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Record counts across all stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub patents: usize,
    pub companies: usize,
    pub ownership_edges: usize,
    pub products: usize,
    pub prior_art: usize,
}

/// The full set of shared stores
#[derive(Debug, Clone, Default)]
pub struct RecordStores {
    pub patents: Arc<PatentStore>,
    pub graph: Arc<GraphStore>,
    pub search: Arc<SearchStore>,
}

impl RecordStores {
    /// Create empty stores
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate fresh stores from a dataset
    ///
    /// # Errors
    /// [`StoreError::Invalid`] when an ownership edge fails validation.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, StoreError> {
        let stores = Self::new();
        for patent in dataset.patents {
            stores.patents.insert(patent);
        }
        for company in dataset.companies {
            stores.graph.add_company(company);
        }
        for edge in dataset.ownership_edges {
            stores.graph.add_edge(edge)?;
        }
        for product in dataset.products {
            stores.search.add_product(product);
        }
        for candidate in dataset.prior_art {
            stores.search.add_prior_art(candidate);
        }
        tracing::debug!(stats = ?stores.stats(), "stores populated");
        Ok(stores)
    }

    /// Stores holding the embedded demo dataset
    ///
    /// # Errors
    /// See [`Dataset::embedded`] and [`RecordStores::from_dataset`].
    pub fn demo() -> Result<Self, StoreError> {
        Self::from_dataset(Dataset::embedded()?)
    }

    /// Stores holding a dataset directory
    ///
    /// # Errors
    /// See [`Dataset::from_dir`] and [`RecordStores::from_dataset`].
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_dataset(Dataset::from_dir(dir)?)
    }

    /// Record counts
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            patents: self.patents.count(),
            companies: self.graph.count(),
            ownership_edges: self.graph.edge_count(),
            products: self.search.product_count(),
            prior_art: self.search.prior_art_count(),
        }
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use knot_analytics::OwnershipResolver;

    #[test]
    fn demo_resolves_sensortech_to_techglobal() {
        let stores = RecordStores::demo().unwrap();
        let resolver = OwnershipResolver::new(stores.graph.as_ref());

        let sensortech = stores.graph.find_company_by_name("SensorTech").unwrap();
        let top = resolver.ultimate_parent(&sensortech.id);
        assert_eq!(stores.graph.get_company(&top).unwrap().name, "TechGlobal Corp");
    }

    #[test]
    fn demo_shell_company_chain() {
        let stores = RecordStores::demo().unwrap();
        let resolver = OwnershipResolver::new(stores.graph.as_ref());
        assert_eq!(resolver.ultimate_parent("COMP004"), "COMP001");
        assert!(resolver.all_subsidiaries("COMP001").contains(&"COMP004".to_string()));
        assert!(resolver.detect_cycles().is_empty());
    }

    #[test]
    fn stats_count_everything() {
        let stores = RecordStores::demo().unwrap();
        let stats = stores.stats();
        assert_eq!(stats.patents, stores.patents.get_all().len());
        assert!(stats.ownership_edges > 0);
    }
}
