//! Dataset loading
//!
//! A dataset is a directory of JSON arrays: `patents.json`,
//! `companies.json`, `products.json`, `prior_art.json` and, optionally,
//! `ownership.json`. Without explicit ownership edges they are derived
//! from the companies' subsidiary lists and ultimate-parent hints.

use crate::error::StoreError;
use chrono::NaiveDate;
use knot_model::{Company, OwnershipEdge, Patent, PriorArtCandidate, ProductInfo};
use serde::de::DeserializeOwned;
use std::path::Path;

const PATENTS_FILE: &str = "patents.json";
const COMPANIES_FILE: &str = "companies.json";
const PRODUCTS_FILE: &str = "products.json";
const PRIOR_ART_FILE: &str = "prior_art.json";
const OWNERSHIP_FILE: &str = "ownership.json";

/// Every record needed to populate the stores
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub patents: Vec<Patent>,
    pub companies: Vec<Company>,
    pub ownership_edges: Vec<OwnershipEdge>,
    pub products: Vec<ProductInfo>,
    pub prior_art: Vec<PriorArtCandidate>,
}

fn parse<T: DeserializeOwned>(file: &str, text: &str) -> Result<Vec<T>, StoreError> {
    serde_json::from_str(text).map_err(|source| StoreError::Parse {
        file: file.to_string(),
        source,
    })
}

fn read(dir: &Path, file: &str) -> Result<Option<String>, StoreError> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io { path, source }),
    }
}

impl Dataset {
    /// The demo dataset compiled into the binary
    ///
    /// # Errors
    /// [`StoreError::Parse`] if an embedded file is malformed.
    pub fn embedded() -> Result<Self, StoreError> {
        let companies: Vec<Company> =
            parse(COMPANIES_FILE, include_str!("../data/companies.json"))?;
        Ok(Self {
            patents: parse(PATENTS_FILE, include_str!("../data/patents.json"))?,
            ownership_edges: derive_ownership_edges(&companies),
            companies,
            products: parse(PRODUCTS_FILE, include_str!("../data/products.json"))?,
            prior_art: parse(PRIOR_ART_FILE, include_str!("../data/prior_art.json"))?,
        })
    }

    /// Load a dataset directory
    ///
    /// Missing files yield empty collections.
    ///
    /// # Errors
    /// [`StoreError::Io`] or [`StoreError::Parse`] for unreadable or
    /// malformed files.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let load = |file: &str| -> Result<Option<String>, StoreError> { read(dir, file) };

        let companies: Vec<Company> = match load(COMPANIES_FILE)? {
            Some(text) => parse(COMPANIES_FILE, &text)?,
            None => Vec::new(),
        };
        let ownership_edges = match load(OWNERSHIP_FILE)? {
            Some(text) => parse(OWNERSHIP_FILE, &text)?,
            None => derive_ownership_edges(&companies),
        };

        let dataset = Self {
            patents: load(PATENTS_FILE)?
                .map(|text| parse(PATENTS_FILE, &text))
                .transpose()?
                .unwrap_or_default(),
            companies,
            ownership_edges,
            products: load(PRODUCTS_FILE)?
                .map(|text| parse(PRODUCTS_FILE, &text))
                .transpose()?
                .unwrap_or_default(),
            prior_art: load(PRIOR_ART_FILE)?
                .map(|text| parse(PRIOR_ART_FILE, &text))
                .transpose()?
                .unwrap_or_default(),
        };
        tracing::info!(
            dir = %dir.display(),
            patents = dataset.patents.len(),
            companies = dataset.companies.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}

/// Derive 100% ownership edges from company hints
///
/// For each company with an ultimate-parent hint: if that parent lists the
/// company as a subsidiary, the parent owns it (SEC filing, 2015-01-01).
/// Otherwise the first company listing it as a subsidiary owns it
/// (corporate filing, 2018-06-01). Companies nobody lists get no edge.
#[must_use]
pub fn derive_ownership_edges(companies: &[Company]) -> Vec<OwnershipEdge> {
    let sec_filing = NaiveDate::from_ymd_opt(2015, 1, 1);
    let corporate_filing = NaiveDate::from_ymd_opt(2018, 6, 1);
    let mut edges = Vec::new();

    for company in companies {
        let Some(hint) = company.ultimate_parent_id.as_deref() else {
            continue;
        };
        let listed_by_hint = companies
            .iter()
            .any(|c| c.id == hint && c.subsidiaries.contains(&company.id));

        let (parent, date, source) = if listed_by_hint {
            (Some(hint), sec_filing, "SEC Filing")
        } else {
            let owner = companies
                .iter()
                .find(|c| c.subsidiaries.contains(&company.id))
                .map(|c| c.id.as_str());
            (owner, corporate_filing, "Corporate Filing")
        };

        let Some(parent) = parent else { continue };
        match OwnershipEdge::new(parent, company.id.as_str(), 100.0) {
            Ok(edge) => {
                let edge = edge.with_source(source);
                edges.push(match date {
                    Some(date) => edge.with_effective_date(date),
                    None => edge,
                });
            }
            Err(err) => tracing::warn!(error = %err, "skipping derived ownership edge"),
        }
    }
    edges
}
