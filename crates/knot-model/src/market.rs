//! Products and prior-art disclosures

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A commercial product that patents may read on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub markets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<NaiveDate>,
}

impl ProductInfo {
    /// Create new product
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            company: String::new(),
            description: String::new(),
            keywords: Vec::new(),
            markets: Vec::new(),
            launch_date: None,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With keywords
    #[inline]
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// A publicly available disclosure that may anticipate a patent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorArtCandidate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Kind of disclosure: patent, paper, product manual, ...
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PriorArtCandidate {
    /// Create new candidate
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: String::new(),
            source: String::new(),
            publication_date: None,
            keywords: Vec::new(),
            url: None,
        }
    }

    /// With text body
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// With publication date
    #[inline]
    #[must_use]
    pub fn with_publication_date(mut self, date: NaiveDate) -> Self {
        self.publication_date = Some(date);
        self
    }

    /// With keywords
    #[inline]
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// False only when published on or after `date`
    ///
    /// An undated disclosure stays a candidate.
    #[inline]
    #[must_use]
    pub fn may_predate(&self, date: NaiveDate) -> bool {
        self.publication_date.map_or(true, |published| published < date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_later_publications_are_ruled_out() {
        let cutoff = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let undated = PriorArtCandidate::new("PA1", "t");
        assert!(undated.may_predate(cutoff));

        let early = undated
            .clone()
            .with_publication_date(NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
        assert!(early.may_predate(cutoff));

        let same_day = undated.with_publication_date(cutoff);
        assert!(!same_day.may_predate(cutoff));
    }
}
