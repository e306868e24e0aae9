use knot_analytics::{
    keyword_set, set_similarity, LandscapeClusterer, OwnershipResolver, OwnershipSource,
};
use knot_model::{Company, OwnershipEdge, Patent};
use proptest::prelude::*;
use std::collections::BTreeSet;

const WORDS: &[&str] = &[
    "iot", "sensor", "cloud", "edge", "mesh", "thermal", "radio", "battery", "ledger", "hull",
];
const PREFIXES: &[&str] = &["G01K", "H04W", "G06Q", "B63C", "F24F"];

struct Graph {
    companies: Vec<Company>,
    edges: Vec<OwnershipEdge>,
}

impl OwnershipSource for Graph {
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
            .map(|c| (c.name.to_lowercase(), c.id.clone()))
            .collect()
    }
}

fn graph(node_count: usize, raw_edges: &[(usize, usize, u8)]) -> Graph {
    let companies = (0..node_count)
        .map(|n| Company::new(format!("C{n}"), format!("Company {n}")))
        .collect();
    let edges = raw_edges
        .iter()
        .filter(|(from, to, _)| *from < node_count && *to < node_count && from != to)
        .filter_map(|(from, to, pct)| {
            OwnershipEdge::new(format!("C{from}"), format!("C{to}"), f64::from(*pct % 101)).ok()
        })
        .collect();
    Graph { companies, edges }
}

fn patents_strategy() -> impl Strategy<Value = Vec<Patent>> {
    proptest::collection::vec(
        (
            proptest::option::of(0..PREFIXES.len()),
            proptest::collection::vec(0..WORDS.len(), 1..4),
        ),
        0..12,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(n, (prefix, words))| {
                let id = format!("P{n}");
                let patent = Patent::new(&id, "USPTO", &id, &id)
                    .with_keywords(words.into_iter().map(|w| WORDS[w]));
                match prefix {
                    Some(p) => patent.with_classification("IPC", &format!("{}1/00", PREFIXES[p])),
                    None => patent,
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_similarity_symmetric_and_bounded(
        a in proptest::collection::btree_set("[a-e]{1,3}", 1..8),
        b in proptest::collection::btree_set("[a-e]{1,3}", 1..8),
    ) {
        let ab = set_similarity(&a, &b);
        prop_assert_eq!(ab, set_similarity(&b, &a));
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(set_similarity(&a, &a), 1.0);
        prop_assert_eq!(set_similarity(&a, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn prop_ultimate_parent_terminates_on_any_graph(
        node_count in 1..12usize,
        raw_edges in proptest::collection::vec((0..12usize, 0..12usize, any::<u8>()), 0..40),
    ) {
        let g = graph(node_count, &raw_edges);
        let resolver = OwnershipResolver::new(&g);
        for company in &g.companies {
            let top = resolver.ultimate_parent(&company.id);
            prop_assert!(g.companies.iter().any(|c| c.id == top));
            prop_assert!(!resolver.all_subsidiaries(&company.id).contains(&company.id));
        }
    }

    #[test]
    fn prop_every_cycle_is_a_loop_of_preferred_parents(
        node_count in 1..10usize,
        raw_edges in proptest::collection::vec((0..10usize, 0..10usize, any::<u8>()), 0..30),
    ) {
        let g = graph(node_count, &raw_edges);
        let resolver = OwnershipResolver::new(&g);
        for cycle in resolver.detect_cycles() {
            prop_assert!(!cycle.is_empty());
            for (i, node) in cycle.iter().enumerate() {
                let next = &cycle[(i + 1) % cycle.len()];
                let parent = resolver.preferred_parent(node).map(|e| e.parent_id);
                prop_assert_eq!(parent.as_ref(), Some(next));
            }
        }
    }

    #[test]
    fn prop_clusters_partition_patents(patents in patents_strategy()) {
        let clusters = LandscapeClusterer::new().cluster(&patents);
        let mut ids: Vec<String> = clusters.iter().flat_map(|c| c.patent_ids.clone()).collect();
        ids.sort();
        let mut expected: Vec<String> = patents.iter().map(|p| p.id.clone()).collect();
        expected.sort();
        prop_assert_eq!(ids, expected);

        let density: f64 = clusters.iter().map(|c| c.density).sum();
        if !patents.is_empty() {
            prop_assert!((density - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_no_legal_merge_remains(patents in patents_strategy()) {
        let clusters = LandscapeClusterer::new().cluster(&patents);
        for (i, a) in clusters.iter().enumerate() {
            for b in &clusters[i + 1..] {
                prop_assert!(set_similarity(&a.keyword_set(), &b.keyword_set()) < 0.15);
            }
        }
    }

    #[test]
    fn prop_reclustering_a_cluster_is_stable(patents in patents_strategy()) {
        let clusterer = LandscapeClusterer::new();
        for cluster in clusterer.cluster(&patents) {
            let members: Vec<Patent> = patents
                .iter()
                .filter(|p| cluster.patent_ids.contains(&p.id))
                .cloned()
                .collect();
            let again = clusterer.cluster(&members);
            prop_assert_eq!(again.len(), 1);
            prop_assert_eq!(keyword_set(&again[0].keywords), cluster.keyword_set());
            let mut left = again[0].patent_ids.clone();
            let mut right = cluster.patent_ids.clone();
            left.sort();
            right.sort();
            prop_assert_eq!(left, right);
        }
    }
}
