//! Testing utilities for KNOT workspace
//!
//! Shared fixtures: ownership graphs with known shapes, patent builders and
//! seeded stores.

#![allow(missing_docs)]

use chrono::NaiveDate;
use knot_model::{Claim, Company, OwnershipEdge, Patent, PriorArtCandidate, ProductInfo};
use knot_store::{Dataset, GraphStore, RecordStores};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn edge(parent: &str, child: &str, percentage: f64) -> OwnershipEdge {
    OwnershipEdge::new(parent, child, percentage).unwrap()
}

/// Parent → Sub1 → Sub2, all 100% owned
pub fn chain_graph() -> GraphStore {
    let graph = GraphStore::new();
    graph.add_company(Company::new("PARENT", "Parent Holdings").with_alias("Parent"));
    graph.add_company(Company::new("SUB1", "First Subsidiary"));
    graph.add_company(Company::new("SUB2", "Second Subsidiary"));
    graph.add_edge(edge("PARENT", "SUB1", 100.0)).unwrap();
    graph.add_edge(edge("SUB1", "SUB2", 100.0)).unwrap();
    graph
}

/// A owns B and B owns A
pub fn cyclic_graph() -> GraphStore {
    let graph = GraphStore::new();
    graph.add_company(Company::new("A", "Alpha Corp"));
    graph.add_company(Company::new("B", "Beta Corp"));
    graph.add_edge(edge("A", "B", 60.0)).unwrap();
    graph.add_edge(edge("B", "A", 40.0)).unwrap();
    graph
}

/// Active US patent with one independent claim and the given keywords
pub fn patent(id: &str, claim: &str, keywords: &[&str]) -> Patent {
    Patent::new(id, "USPTO", format!("US{id}"), format!("Patent {id}"))
        .with_abstract(claim)
        .with_claim(Claim::independent(1, claim))
        .with_keywords(keywords.iter().copied())
        .with_jurisdictions(["US"])
        .with_filing_date(date(2018, 1, 1))
}

pub fn product(id: &str, name: &str, description: &str) -> ProductInfo {
    ProductInfo::new(id, name).with_description(description)
}

pub fn prior_art(id: &str, published: NaiveDate, keywords: &[&str]) -> PriorArtCandidate {
    PriorArtCandidate::new(id, format!("Prior art {id}"))
        .with_publication_date(published)
        .with_keywords(keywords.iter().copied())
}

/// Stores holding the embedded demo dataset
pub fn demo_stores() -> RecordStores {
    RecordStores::demo().unwrap()
}

/// Stores holding exactly the given records
pub fn stores_with(
    patents: Vec<Patent>,
    products: Vec<ProductInfo>,
    prior_art: Vec<PriorArtCandidate>,
) -> RecordStores {
    RecordStores::from_dataset(Dataset {
        patents,
        products,
        prior_art,
        ..Dataset::default()
    })
    .unwrap()
}
