//! Ownership graph traversal
//!
//! Edges point from owner to owned company. A company may carry several
//! parent edges (conflicting ownership claims); traversal upward always
//! follows the preferred one: highest percentage, first inserted on ties.

use knot_model::{Company, CompanyType, OwnershipEdge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Read access to an ownership graph
///
/// Implementations return snapshots. Edge lists and the name index must be
/// in a stable insertion order so traversal is reproducible.
pub trait OwnershipSource {
    /// Company by id
    fn company(&self, id: &str) -> Option<Company>;

    /// All companies in insertion order
    fn companies(&self) -> Vec<Company>;

    /// Edges whose child is `id`
    fn parent_edges(&self, id: &str) -> Vec<OwnershipEdge>;

    /// Edges whose parent is `id`
    fn child_edges(&self, id: &str) -> Vec<OwnershipEdge>;

    /// Lower-cased canonical names and aliases paired with company ids,
    /// in insertion order
    fn name_index(&self) -> Vec<(String, String)>;
}

/// Result of resolving a patent assignee name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeResolution {
    pub assignee: String,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_type: Option<CompanyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultimate_parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ultimate_parent_name: Option<String>,
}

impl AssigneeResolution {
    fn unresolved(assignee: &str) -> Self {
        Self {
            assignee: assignee.to_string(),
            resolved: false,
            company_id: None,
            company_name: None,
            company_type: None,
            ultimate_parent_id: None,
            ultimate_parent_name: None,
        }
    }
}

/// Connected neighbourhood of a company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipSubgraph {
    pub nodes: Vec<Company>,
    pub edges: Vec<OwnershipEdge>,
}

/// Traversal algorithms over an [`OwnershipSource`]
#[derive(Debug, Clone, Copy)]
pub struct OwnershipResolver<'a, S: OwnershipSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: OwnershipSource + ?Sized> OwnershipResolver<'a, S> {
    /// Create new resolver
    #[inline]
    #[must_use]
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Parent edge with the highest percentage, first one on ties
    #[must_use]
    pub fn preferred_parent(&self, id: &str) -> Option<OwnershipEdge> {
        self.source
            .parent_edges(id)
            .into_iter()
            .fold(None, |best: Option<OwnershipEdge>, edge| match best {
                Some(b) if b.percentage >= edge.percentage => Some(b),
                _ => Some(edge),
            })
    }

    /// Follow preferred parent edges to the top of the chain
    ///
    /// Returns the first company without parents. On a cycle the first
    /// revisited company is returned instead, so at most |V| steps are taken.
    #[must_use]
    pub fn ultimate_parent(&self, id: &str) -> String {
        let mut visited = HashSet::new();
        let mut current = id.to_string();
        loop {
            if !visited.insert(current.clone()) {
                tracing::debug!(company = %id, repeated = %current, "ownership cycle reached");
                return current;
            }
            match self.preferred_parent(&current) {
                Some(edge) => current = edge.parent_id,
                None => return current,
            }
        }
    }

    /// Every direct and indirect subsidiary, breadth-first
    ///
    /// The seed is never part of the result, even when a cycle leads back
    /// to it.
    #[must_use]
    pub fn all_subsidiaries(&self, id: &str) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::from([id.to_string()]);
        let mut queue = VecDeque::from([id.to_string()]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for edge in self.source.child_edges(&current) {
                if visited.insert(edge.child_id.clone()) {
                    found.push(edge.child_id.clone());
                    queue.push_back(edge.child_id);
                }
            }
        }
        found
    }

    /// Ownership loops along preferred parent edges
    ///
    /// Each loop is reported once, starting from the company where it was
    /// first entered, no matter how many chains lead into it.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
        let mut cycles = Vec::new();

        for company in self.source.companies() {
            let mut path: Vec<String> = Vec::new();
            let mut position: HashMap<String, usize> = HashMap::new();
            let mut current = company.id;

            loop {
                if let Some(&start) = position.get(&current) {
                    let cycle = path[start..].to_vec();
                    if seen.insert(cycle.iter().cloned().collect()) {
                        cycles.push(cycle);
                    }
                    break;
                }
                position.insert(current.clone(), path.len());
                path.push(current.clone());
                match self.preferred_parent(&current) {
                    Some(edge) => current = edge.parent_id,
                    None => break,
                }
            }
        }
        cycles
    }

    /// Resolve a free-text name to a company
    ///
    /// Exact case-insensitive match on a canonical name or alias wins.
    /// Otherwise the first indexed name that contains, or is contained in,
    /// the query is taken. No ranking is applied.
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> Option<Company> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let index = self.source.name_index();

        let id = index
            .iter()
            .find(|(indexed, _)| *indexed == needle)
            .or_else(|| {
                index
                    .iter()
                    .find(|(indexed, _)| indexed.contains(&needle) || needle.contains(indexed.as_str()))
            })
            .map(|(_, id)| id.as_str())?;

        self.source.company(id)
    }

    /// Resolve an assignee name and attach its ultimate parent
    #[must_use]
    pub fn resolve_assignee(&self, assignee: &str) -> AssigneeResolution {
        let Some(company) = self.resolve_name(assignee) else {
            return AssigneeResolution::unresolved(assignee);
        };
        let parent_id = self.ultimate_parent(&company.id);
        let parent_name = self.source.company(&parent_id).map(|c| c.name);

        AssigneeResolution {
            assignee: assignee.to_string(),
            resolved: true,
            company_id: Some(company.id),
            company_name: Some(company.name),
            company_type: Some(company.company_type),
            ultimate_parent_id: Some(parent_id),
            ultimate_parent_name: parent_name,
        }
    }

    /// Everything reachable from `id` over parent and child edges
    ///
    /// Nodes come out in breadth-first order, each node and edge once.
    /// Ids referenced by edges but missing from the source are skipped as
    /// nodes.
    #[must_use]
    pub fn ownership_subgraph(&self, id: &str) -> OwnershipSubgraph {
        let mut visited: HashSet<String> = HashSet::from([id.to_string()]);
        let mut queue = VecDeque::from([id.to_string()]);
        let mut graph = OwnershipSubgraph::default();

        while let Some(current) = queue.pop_front() {
            if let Some(company) = self.source.company(&current) {
                graph.nodes.push(company);
            }
            let parents = self.source.parent_edges(&current);
            let children = self.source.child_edges(&current);
            for edge in parents.into_iter().chain(children) {
                for next in [&edge.parent_id, &edge.child_id] {
                    if visited.insert(next.clone()) {
                        queue.push_back(next.clone());
                    }
                }
                if !graph.edges.contains(&edge) {
                    graph.edges.push(edge);
                }
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct MemGraph {
        companies: Vec<Company>,
        edges: Vec<OwnershipEdge>,
    }

    impl MemGraph {
        fn with_company(mut self, id: &str, name: &str) -> Self {
            self.companies.push(Company::new(id, name));
            self
        }

        fn with_edge(mut self, parent: &str, child: &str, pct: f64) -> Self {
            self.edges.push(OwnershipEdge::new(parent, child, pct).unwrap());
            self
        }
    }

    impl OwnershipSource for MemGraph {
        fn company(&self, id: &str) -> Option<Company> {
            self.companies.iter().find(|c| c.id == id).cloned()
        }

        fn companies(&self) -> Vec<Company> {
            self.companies.clone()
        }

        fn parent_edges(&self, id: &str) -> Vec<OwnershipEdge> {
            self.edges.iter().filter(|e| e.child_id == id).cloned().collect()
        }

        fn child_edges(&self, id: &str) -> Vec<OwnershipEdge> {
            self.edges.iter().filter(|e| e.parent_id == id).cloned().collect()
        }

        fn name_index(&self) -> Vec<(String, String)> {
            self.companies
                .iter()
                .flat_map(|c| c.names().map(|n| (n.to_lowercase(), c.id.clone())).collect::<Vec<_>>())
                .collect()
        }
    }

    fn chain() -> MemGraph {
        MemGraph::default()
            .with_company("P", "Parent Holdings")
            .with_company("S1", "Sub One")
            .with_company("S2", "Sub Two")
            .with_edge("P", "S1", 100.0)
            .with_edge("S1", "S2", 80.0)
    }

    #[test]
    fn ultimate_parent_of_chain() {
        let graph = chain();
        let resolver = OwnershipResolver::new(&graph);
        assert_eq!(resolver.ultimate_parent("S2"), "P");
        assert_eq!(resolver.ultimate_parent("P"), "P");
    }

    #[test]
    fn subsidiaries_of_chain() {
        let graph = chain();
        let resolver = OwnershipResolver::new(&graph);
        assert_eq!(resolver.all_subsidiaries("P"), vec!["S1", "S2"]);
        assert!(resolver.all_subsidiaries("S2").is_empty());
    }

    #[test]
    fn highest_percentage_parent_wins() {
        let graph = MemGraph::default()
            .with_company("A", "A")
            .with_company("B", "B")
            .with_company("C", "C")
            .with_edge("A", "C", 30.0)
            .with_edge("B", "C", 70.0);
        assert_eq!(OwnershipResolver::new(&graph).ultimate_parent("C"), "B");
    }

    #[test]
    fn tie_keeps_first_inserted_edge() {
        let graph = MemGraph::default()
            .with_company("A", "A")
            .with_company("B", "B")
            .with_company("C", "C")
            .with_edge("A", "C", 50.0)
            .with_edge("B", "C", 50.0);
        assert_eq!(OwnershipResolver::new(&graph).ultimate_parent("C"), "A");
    }

    #[test]
    fn cycle_terminates() {
        let graph = MemGraph::default()
            .with_company("A", "A")
            .with_company("B", "B")
            .with_edge("A", "B", 60.0)
            .with_edge("B", "A", 60.0);
        let resolver = OwnershipResolver::new(&graph);
        let top = resolver.ultimate_parent("A");
        assert!(top == "A" || top == "B");
        assert_eq!(resolver.all_subsidiaries("A"), vec!["B"]);
    }

    #[test]
    fn cycles_are_deduplicated() {
        let graph = MemGraph::default()
            .with_company("A", "A")
            .with_company("B", "B")
            .with_company("C", "C")
            .with_company("D", "D")
            .with_edge("B", "A", 100.0)
            .with_edge("C", "B", 100.0)
            .with_edge("A", "C", 100.0)
            .with_edge("A", "D", 100.0);
        let cycles = OwnershipResolver::new(&graph).detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["A", "B", "C"]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = chain();
        assert!(OwnershipResolver::new(&graph).detect_cycles().is_empty());
    }

    #[test]
    fn name_resolution_exact_then_substring() {
        let mut graph = chain();
        graph.companies[1].aliases.push("SubCo".to_string());
        let resolver = OwnershipResolver::new(&graph);

        assert_eq!(resolver.resolve_name("subco").map(|c| c.id).as_deref(), Some("S1"));
        assert_eq!(resolver.resolve_name("Parent").map(|c| c.id).as_deref(), Some("P"));
        assert_eq!(
            resolver.resolve_name("Sub Two GmbH & Co").map(|c| c.id).as_deref(),
            Some("S2")
        );
        assert!(resolver.resolve_name("Unrelated").is_none());
        assert!(resolver.resolve_name("   ").is_none());
    }

    #[test]
    fn ambiguous_substring_takes_first_indexed() {
        let graph = chain();
        let resolver = OwnershipResolver::new(&graph);
        assert_eq!(resolver.resolve_name("sub").map(|c| c.id).as_deref(), Some("S1"));
    }

    #[test]
    fn assignee_resolution_carries_parent() {
        let graph = chain();
        let resolver = OwnershipResolver::new(&graph);

        let resolved = resolver.resolve_assignee("Sub Two");
        assert!(resolved.resolved);
        assert_eq!(resolved.ultimate_parent_id.as_deref(), Some("P"));
        assert_eq!(resolved.ultimate_parent_name.as_deref(), Some("Parent Holdings"));

        let missing = resolver.resolve_assignee("Nobody Ltd");
        assert!(!missing.resolved);
        assert!(missing.company_id.is_none());
    }

    #[test]
    fn subgraph_collects_both_directions_once() {
        let graph = chain();
        let sub = OwnershipResolver::new(&graph).ownership_subgraph("S1");
        let ids: Vec<_> = sub.nodes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "P", "S2"]);
        assert_eq!(sub.edges.len(), 2);
    }
}
