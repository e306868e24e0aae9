//! Technology clustering and white-space detection
//!
//! Patents are first grouped by the 4-character prefix of their first
//! classification code. Groups whose aggregated keyword sets are similar
//! enough are then merged pass by pass until a full pass merges nothing.

use crate::similarity::{keyword_set, set_similarity};
use indexmap::IndexMap;
use knot_model::Patent;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Minimum keyword similarity for two clusters to merge
pub const MERGE_THRESHOLD: f64 = 0.15;
/// Clusters below this density are reported as white spaces
pub const LOW_DENSITY_THRESHOLD: f64 = 0.10;
/// Cap on the uncovered white-space score
pub const UNCOVERED_SCORE_CAP: f64 = 0.9;
/// Suggested keywords per white space
pub const MAX_SUGGESTED_KEYWORDS: usize = 5;

const ADJACENT_CLUSTER_LIMIT: usize = 3;
const UNCLASSIFIED: &str = "NONE";

/// A technology cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub patent_ids: Vec<String>,
    /// Aggregated, case-folded and sorted
    pub keywords: Vec<String>,
    /// Share of all clustered patents in this cluster
    pub density: f64,
    pub classification_codes: Vec<String>,
    /// Free-text description, set when an advisor labels the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Cluster {
    /// Keyword set view
    #[must_use]
    pub fn keyword_set(&self) -> BTreeSet<String> {
        self.keywords.iter().cloned().collect()
    }
}

/// Why a white space was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteSpaceKind {
    /// Universe keywords no cluster covers
    Uncovered,
    /// A sparsely populated cluster
    LowDensity,
    /// Proposed by the advisory model
    Advised,
}

/// An innovation opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhiteSpace {
    pub id: String,
    pub kind: WhiteSpaceKind,
    pub description: String,
    pub keywords: Vec<String>,
    pub adjacent_clusters: Vec<String>,
    pub opportunity_score: f64,
}

#[derive(Debug, Clone)]
struct Group {
    id: String,
    label: String,
    patent_ids: Vec<String>,
    keywords: BTreeSet<String>,
    codes: BTreeSet<String>,
}

impl Group {
    fn absorb(mut self, other: Group) -> Self {
        self.label = format!("{} + {}", self.label, other.label);
        self.patent_ids.extend(other.patent_ids);
        self.keywords.extend(other.keywords);
        self.codes.extend(other.codes);
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn into_cluster(self, total: usize) -> Cluster {
        let density = if total == 0 {
            0.0
        } else {
            self.patent_ids.len() as f64 / total as f64
        };
        Cluster {
            id: self.id,
            label: self.label,
            patent_ids: self.patent_ids,
            keywords: self.keywords.into_iter().collect(),
            density,
            classification_codes: self.codes.into_iter().collect(),
            description: None,
        }
    }
}

/// Clusters patents by classification prefix and keyword similarity
#[derive(Debug, Clone, Copy)]
pub struct LandscapeClusterer {
    merge_threshold: f64,
}

impl Default for LandscapeClusterer {
    fn default() -> Self {
        Self {
            merge_threshold: MERGE_THRESHOLD,
        }
    }
}

impl LandscapeClusterer {
    /// Create new clusterer with the default threshold
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With merge threshold
    #[inline]
    #[must_use]
    pub fn with_merge_threshold(mut self, threshold: f64) -> Self {
        self.merge_threshold = threshold;
        self
    }

    /// Partition `patents` into clusters
    ///
    /// Cluster ids (`CLU001`, ...) follow the order in which classification
    /// prefixes are first seen. Within a pass each cluster merges with the
    /// first later cluster that reaches the threshold.
    #[must_use]
    pub fn cluster(&self, patents: &[Patent]) -> Vec<Cluster> {
        let mut groups = Self::group_by_prefix(patents);

        let mut pass = 0;
        loop {
            pass += 1;
            let (next, merged) = self.merge_pass(groups);
            groups = next;
            if !merged {
                break;
            }
            tracing::debug!(pass, clusters = groups.len(), "cluster merge pass");
        }

        groups
            .into_iter()
            .map(|g| g.into_cluster(patents.len()))
            .collect()
    }

    fn group_by_prefix(patents: &[Patent]) -> Vec<Group> {
        let mut by_prefix: IndexMap<String, Group> = IndexMap::new();
        for patent in patents {
            let prefix = patent
                .classification_prefix()
                .unwrap_or_else(|| UNCLASSIFIED.to_string());
            let next_id = by_prefix.len() + 1;
            let group = by_prefix.entry(prefix.clone()).or_insert_with(|| Group {
                id: format!("CLU{next_id:03}"),
                label: format!("{prefix} cluster"),
                patent_ids: Vec::new(),
                keywords: BTreeSet::new(),
                codes: BTreeSet::new(),
            });
            group.patent_ids.push(patent.id.clone());
            group.keywords.extend(keyword_set(&patent.keywords));
            group
                .codes
                .extend(patent.classifications.iter().map(|c| c.code.clone()));
        }
        by_prefix.into_values().collect()
    }

    fn merge_pass(&self, groups: Vec<Group>) -> (Vec<Group>, bool) {
        let mut absorbed: HashSet<usize> = HashSet::new();
        let mut merged_any = false;
        let mut out = Vec::with_capacity(groups.len());

        for i in 0..groups.len() {
            if absorbed.contains(&i) {
                continue;
            }
            let mut current = groups[i].clone();
            for j in (i + 1)..groups.len() {
                if absorbed.contains(&j) {
                    continue;
                }
                if set_similarity(&current.keywords, &groups[j].keywords) >= self.merge_threshold {
                    current = current.absorb(groups[j].clone());
                    absorbed.insert(j);
                    merged_any = true;
                    break;
                }
            }
            out.push(current);
        }
        (out, merged_any)
    }
}

/// Report uncovered universe keywords and sparsely populated clusters
///
/// At most one uncovered white space is emitted first, followed by one
/// low-density entry per cluster below [`LOW_DENSITY_THRESHOLD`]. Ids run
/// `WS001`, `WS002`, ... in emission order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn find_white_spaces(clusters: &[Cluster], universe: &BTreeSet<String>) -> Vec<WhiteSpace> {
    let mut spaces = Vec::new();

    let covered: BTreeSet<String> = clusters
        .iter()
        .flat_map(|c| c.keywords.iter().map(|k| k.to_lowercase()))
        .collect();
    let universe = keyword_set(universe);
    let uncovered: Vec<String> = universe.difference(&covered).cloned().collect();

    if !uncovered.is_empty() {
        let suggested: Vec<String> = uncovered
            .iter()
            .take(MAX_SUGGESTED_KEYWORDS)
            .cloned()
            .collect();
        spaces.push(WhiteSpace {
            id: String::new(),
            kind: WhiteSpaceKind::Uncovered,
            description: format!("Uncovered technology area: {}", suggested.join(", ")),
            keywords: suggested,
            adjacent_clusters: clusters
                .iter()
                .take(ADJACENT_CLUSTER_LIMIT)
                .map(|c| c.id.clone())
                .collect(),
            opportunity_score: UNCOVERED_SCORE_CAP
                .min(uncovered.len() as f64 / universe.len() as f64),
        });
    }

    for cluster in clusters.iter().filter(|c| c.density < LOW_DENSITY_THRESHOLD) {
        spaces.push(WhiteSpace {
            id: String::new(),
            kind: WhiteSpaceKind::LowDensity,
            description: format!("Low density area near {}", cluster.label),
            keywords: cluster
                .keywords
                .iter()
                .take(MAX_SUGGESTED_KEYWORDS)
                .cloned()
                .collect(),
            adjacent_clusters: vec![cluster.id.clone()],
            opportunity_score: 1.0 - cluster.density,
        });
    }

    for (n, space) in spaces.iter_mut().enumerate() {
        space.id = format!("WS{:03}", n + 1);
    }
    spaces
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn patent(id: &str, code: Option<&str>, keywords: &[&str]) -> Patent {
        let p = Patent::new(id, "USPTO", id, id).with_keywords(keywords.iter().copied());
        match code {
            Some(code) => p.with_classification("IPC", code),
            None => p,
        }
    }

    #[test]
    fn groups_by_prefix_in_first_seen_order() {
        let patents = vec![
            patent("P1", Some("G01K1/02"), &["thermometer"]),
            patent("P2", Some("H04W4/38"), &["radio"]),
            patent("P3", Some("G01K7/00"), &["thermistor"]),
            patent("P4", None, &["ledger"]),
        ];
        let clusters = LandscapeClusterer::new().cluster(&patents);

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].id, "CLU001");
        assert_eq!(clusters[0].label, "G01K cluster");
        assert_eq!(clusters[0].patent_ids, vec!["P1", "P3"]);
        assert_eq!(clusters[0].classification_codes, vec!["G01K1/02", "G01K7/00"]);
        assert_eq!(clusters[2].label, "NONE cluster");
        assert!((clusters[0].density - 0.5).abs() < 1e-12);
    }

    #[test]
    fn similar_groups_merge() {
        let patents = vec![
            patent("P1", Some("G01K1/02"), &["iot", "sensor", "temperature"]),
            patent("P2", Some("H04W4/38"), &["iot", "sensor", "wireless"]),
            patent("P3", Some("G06Q10/00"), &["ledger", "billing"]),
        ];
        let clusters = LandscapeClusterer::new().cluster(&patents);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].label, "G01K cluster + H04W cluster");
        assert_eq!(clusters[0].patent_ids, vec!["P1", "P2"]);
        assert_eq!(
            clusters[0].keywords,
            vec!["iot", "sensor", "temperature", "wireless"]
        );
        assert_eq!(clusters[1].id, "CLU003");
    }

    #[test]
    fn merging_runs_to_fixed_point() {
        // A~B merges in the first pass, the merged AB then reaches C
        let patents = vec![
            patent("P1", Some("AAAA"), &["alpha", "beta"]),
            patent("P2", Some("BBBB"), &["beta", "gamma"]),
            patent("P3", Some("CCCC"), &["gamma", "delta", "epsilon", "zeta"]),
        ];
        let clusters = LandscapeClusterer::new().cluster(&patents);
        assert_eq!(clusters.len(), 1);
        for (i, a) in clusters.iter().enumerate() {
            for b in &clusters[i + 1..] {
                assert!(set_similarity(&a.keyword_set(), &b.keyword_set()) < MERGE_THRESHOLD);
            }
        }
    }

    #[test]
    fn empty_input_has_no_clusters() {
        assert!(LandscapeClusterer::new().cluster(&[]).is_empty());
    }

    #[test]
    fn uncovered_and_low_density_white_spaces() {
        let mut patents: Vec<Patent> = (0..10)
            .map(|n| patent(&format!("P{n}"), Some("G01K1/02"), &["sensor"]))
            .collect();
        patents.push(patent("PX", Some("B63C11/00"), &["hull"]));
        let clusters = LandscapeClusterer::new().cluster(&patents);
        assert_eq!(clusters.len(), 2);

        let universe = keyword_set(["sensor", "hull", "quantum", "edge-ml"]);
        let spaces = find_white_spaces(&clusters, &universe);

        assert_eq!(spaces.len(), 2);
        assert_eq!(spaces[0].id, "WS001");
        assert_eq!(spaces[0].kind, WhiteSpaceKind::Uncovered);
        assert_eq!(spaces[0].keywords, vec!["edge-ml", "quantum"]);
        assert_eq!(spaces[0].adjacent_clusters, vec!["CLU001", "CLU002"]);
        assert!((spaces[0].opportunity_score - 0.5).abs() < 1e-12);

        assert_eq!(spaces[1].id, "WS002");
        assert_eq!(spaces[1].kind, WhiteSpaceKind::LowDensity);
        assert_eq!(spaces[1].description, "Low density area near B63C cluster");
        assert_eq!(spaces[1].adjacent_clusters, vec!["CLU002"]);
        assert!((spaces[1].opportunity_score - (1.0 - 1.0 / 11.0)).abs() < 1e-12);
    }

    #[test]
    fn uncovered_score_is_capped() {
        let universe = keyword_set(["a1x", "b2y"]);
        let spaces = find_white_spaces(&[], &universe);
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].opportunity_score, UNCOVERED_SCORE_CAP);
    }
}
