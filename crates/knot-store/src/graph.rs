//! Company and ownership graph store

use crate::error::StoreError;
use indexmap::IndexMap;
use knot_analytics::{OwnershipResolver, OwnershipSource};
use knot_model::{Company, OwnershipEdge};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct GraphInner {
    companies: IndexMap<String, Company>,
    edges: Vec<OwnershipEdge>,
    /// Lower-cased name or alias -> company id
    ///
    /// A later registration takes over the id but keeps the name's position.
    names: IndexMap<String, String>,
}

/// Companies, ownership edges and an insertion-ordered name index
#[derive(Debug, Default)]
pub struct GraphStore {
    inner: RwLock<GraphInner>,
}

impl GraphStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a company and index its canonical name and aliases
    pub fn add_company(&self, company: Company) {
        let mut inner = self.inner.write();
        for name in company.names() {
            inner.names.insert(name.to_lowercase(), company.id.clone());
        }
        inner.companies.insert(company.id.clone(), company);
    }

    /// Insert a validated ownership edge
    ///
    /// # Errors
    /// [`StoreError::Invalid`] when the edge fails validation.
    pub fn add_edge(&self, edge: OwnershipEdge) -> Result<(), StoreError> {
        edge.validate()?;
        self.inner.write().edges.push(edge);
        Ok(())
    }

    /// Company by id
    #[must_use]
    pub fn get_company(&self, id: &str) -> Option<Company> {
        self.inner.read().companies.get(id).cloned()
    }

    /// Every company in insertion order
    #[must_use]
    pub fn all_companies(&self) -> Vec<Company> {
        self.inner.read().companies.values().cloned().collect()
    }

    /// Every ownership edge in insertion order
    #[must_use]
    pub fn edges(&self) -> Vec<OwnershipEdge> {
        self.inner.read().edges.clone()
    }

    /// Resolve a name or alias to a company
    #[must_use]
    pub fn find_company_by_name(&self, name: &str) -> Option<Company> {
        OwnershipResolver::new(self).resolve_name(name)
    }

    /// Number of companies
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().companies.len()
    }

    /// Number of ownership edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }
}

impl OwnershipSource for GraphStore {
    fn company(&self, id: &str) -> Option<Company> {
        self.get_company(id)
    }

    fn companies(&self) -> Vec<Company> {
        self.all_companies()
    }

    fn parent_edges(&self, id: &str) -> Vec<OwnershipEdge> {
        self.inner
            .read()
            .edges
            .iter()
            .filter(|e| e.child_id == id)
            .cloned()
            .collect()
    }

    fn child_edges(&self, id: &str) -> Vec<OwnershipEdge> {
        self.inner
            .read()
            .edges
            .iter()
            .filter(|e| e.parent_id == id)
            .cloned()
            .collect()
    }

    fn name_index(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .names
            .iter()
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect()
    }
}
