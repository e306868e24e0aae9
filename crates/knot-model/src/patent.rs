//! Patent records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Patent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatentStatus {
    /// In force
    #[default]
    Active,
    /// Term ended
    Expired,
    /// Dropped by the owner
    Abandoned,
}

impl PatentStatus {
    /// Lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for PatentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent or dependent claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimKind {
    #[default]
    Independent,
    Dependent,
}

/// One numbered claim of a patent
///
/// A dependent claim's `depends_on` references a lower claim number of the
/// same patent. Callers loading records are responsible for that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub number: u32,
    #[serde(rename = "type", default)]
    pub kind: ClaimKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<u32>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_text: Option<String>,
}

impl Claim {
    /// Create new independent claim
    #[inline]
    #[must_use]
    pub fn independent(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            kind: ClaimKind::Independent,
            depends_on: None,
            text: text.into(),
            normalized_text: None,
        }
    }

    /// Create new dependent claim
    #[inline]
    #[must_use]
    pub fn dependent(number: u32, parent: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            kind: ClaimKind::Dependent,
            depends_on: Some(parent),
            text: text.into(),
            normalized_text: None,
        }
    }

    /// Normalized text if present, raw text otherwise
    #[inline]
    #[must_use]
    pub fn best_text(&self) -> &str {
        self.normalized_text.as_deref().unwrap_or(&self.text)
    }
}

/// Classification code (IPC, CPC, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub system: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl Classification {
    /// Create new classification
    #[inline]
    #[must_use]
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventor {
    pub name: String,
    #[serde(default)]
    pub country: String,
}

/// A patent record as held by the patent store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patent {
    pub id: String,
    /// Source registry: USPTO, EPO or CGPDTM
    pub source: String,
    pub publication_number: String,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub inventors: Vec<Inventor>,
    #[serde(default)]
    pub filing_date: Option<NaiveDate>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub status: PatentStatus,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_abstract: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Patent {
    /// Create new patent with the mandatory identity fields
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        publication_number: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            publication_number: publication_number.into(),
            title: title.into(),
            abstract_text: String::new(),
            claims: Vec::new(),
            assignees: Vec::new(),
            inventors: Vec::new(),
            filing_date: None,
            publication_date: None,
            expiry_date: None,
            classifications: Vec::new(),
            keywords: Vec::new(),
            raw_text: String::new(),
            language: default_language(),
            status: PatentStatus::Active,
            jurisdictions: Vec::new(),
            normalized_title: None,
            normalized_abstract: None,
        }
    }

    /// With abstract
    #[inline]
    #[must_use]
    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = text.into();
        self
    }

    /// With claim appended
    #[inline]
    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    /// With assignee appended
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignees.push(assignee.into());
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

    /// With classification appended
    #[inline]
    #[must_use]
    pub fn with_classification(mut self, system: &str, code: &str) -> Self {
        self.classifications.push(Classification::new(system, code));
        self
    }

    /// With jurisdictions
    #[inline]
    #[must_use]
    pub fn with_jurisdictions<I, S>(mut self, jurisdictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jurisdictions = jurisdictions.into_iter().map(Into::into).collect();
        self
    }

    /// With filing date
    #[inline]
    #[must_use]
    pub fn with_filing_date(mut self, date: NaiveDate) -> Self {
        self.filing_date = Some(date);
        self
    }

    /// With publication date
    #[inline]
    #[must_use]
    pub fn with_publication_date(mut self, date: NaiveDate) -> Self {
        self.publication_date = Some(date);
        self
    }

    /// With expiry date
    #[inline]
    #[must_use]
    pub fn with_expiry_date(mut self, date: NaiveDate) -> Self {
        self.expiry_date = Some(date);
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: PatentStatus) -> Self {
        self.status = status;
        self
    }

    /// True when the patent no longer blocks anyone on `today`
    ///
    /// Expired or abandoned status, or an expiry date strictly before `today`.
    #[must_use]
    pub fn is_lapsed(&self, today: NaiveDate) -> bool {
        matches!(self.status, PatentStatus::Expired | PatentStatus::Abandoned)
            || self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// True when the patent is registered in at least one of `markets`
    ///
    /// An empty market list matches every patent.
    #[must_use]
    pub fn covers_any(&self, markets: &[String]) -> bool {
        markets.is_empty()
            || markets
                .iter()
                .any(|m| self.jurisdictions.iter().any(|j| j.eq_ignore_ascii_case(m)))
    }

    /// Four-character prefix of the first classification code
    #[must_use]
    pub fn classification_prefix(&self) -> Option<String> {
        self.classifications
            .first()
            .map(|c| c.code.chars().take(4).collect())
    }

    /// First listed assignee
    #[inline]
    #[must_use]
    pub fn primary_assignee(&self) -> Option<&str> {
        self.assignees.first().map(String::as_str)
    }

    /// Title, abstract and every claim joined with spaces
    #[must_use]
    pub fn full_text(&self) -> String {
        let mut text = format!("{} {}", self.title, self.abstract_text);
        for claim in &self.claims {
            text.push(' ');
            text.push_str(&claim.text);
        }
        text
    }
}
