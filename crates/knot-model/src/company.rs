//! Companies and ownership edges

use crate::error::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Corporate form of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    #[default]
    Corporation,
    Subsidiary,
    Shell,
}

/// A company known to the ownership graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Denormalized hint, the ownership edges are authoritative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimate_parent_id: Option<String>,
    #[serde(default)]
    pub subsidiaries: Vec<String>,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(rename = "type", default)]
    pub company_type: CompanyType,
    #[serde(default)]
    pub patent_ids: Vec<String>,
}

impl Company {
    /// Create new company
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            ultimate_parent_id: None,
            subsidiaries: Vec::new(),
            jurisdiction: String::new(),
            company_type: CompanyType::Corporation,
            patent_ids: Vec::new(),
        }
    }

    /// With alias appended
    #[inline]
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// With company type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, company_type: CompanyType) -> Self {
        self.company_type = company_type;
        self
    }

    /// With jurisdiction
    #[inline]
    #[must_use]
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = jurisdiction.into();
        self
    }

    /// With patent ids
    #[inline]
    #[must_use]
    pub fn with_patents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patent_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Canonical name followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Directed ownership claim: `parent_id` owns `percentage` of `child_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipEdge {
    pub parent_id: String,
    pub child_id: String,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub source: String,
}

impl OwnershipEdge {
    /// Create new validated edge
    ///
    /// # Errors
    /// Returns [`ModelError`] when the percentage is outside [0, 100] or the
    /// edge points at its own owner.
    pub fn new(
        parent_id: impl Into<String>,
        child_id: impl Into<String>,
        percentage: f64,
    ) -> Result<Self, ModelError> {
        let edge = Self {
            parent_id: parent_id.into(),
            child_id: child_id.into(),
            percentage,
            effective_date: None,
            source: String::new(),
        };
        edge.validate()?;
        Ok(edge)
    }

    /// With effective date
    #[inline]
    #[must_use]
    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }

    /// With provenance
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Check the percentage range and reject self-ownership
    ///
    /// # Errors
    /// Returns [`ModelError`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=100.0).contains(&self.percentage) {
            return Err(ModelError::InvalidPercentage {
                parent_id: self.parent_id.clone(),
                child_id: self.child_id.clone(),
                percentage: self.percentage,
            });
        }
        if self.parent_id == self.child_id {
            return Err(ModelError::SelfOwnership(self.parent_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_percentage_bounds() {
        assert!(OwnershipEdge::new("A", "B", 0.0).is_ok());
        assert!(OwnershipEdge::new("A", "B", 100.0).is_ok());
        assert!(matches!(
            OwnershipEdge::new("A", "B", 100.5),
            Err(ModelError::InvalidPercentage { .. })
        ));
        assert!(OwnershipEdge::new("A", "B", f64::NAN).is_err());
        assert!(OwnershipEdge::new("A", "B", -1.0).is_err());
    }

    #[test]
    fn edge_rejects_self_ownership() {
        assert_eq!(
            OwnershipEdge::new("A", "A", 50.0),
            Err(ModelError::SelfOwnership("A".to_string()))
        );
    }

    #[test]
    fn names_lists_canonical_first() {
        let company = Company::new("C1", "SensorTech Inc").with_alias("SensorTech");
        let names: Vec<_> = company.names().collect();
        assert_eq!(names, vec!["SensorTech Inc", "SensorTech"]);
    }
}
