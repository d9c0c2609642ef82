//! # Filter State
//! Query criteria for the upstream fetch. The live criteria are one immutable
//! snapshot; every change produces a new snapshot (and, in the dashboard, a
//! new fetch).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::article::{Article, ArticleKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    News,
    Blog,
}

impl TypeFilter {
    /// Untyped articles count as news.
    pub fn matches(&self, article: &Article) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::News => article.effective_kind() == ArticleKind::News,
            TypeFilter::Blog => article.effective_kind() == ArticleKind::Blog,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default, rename = "type")]
    pub kind: TypeFilter,
}

/// Partial update as sent by the search bar. Dates are raw form values:
/// an empty string clears the bound.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterPatch {
    pub search_query: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TypeFilter>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid {field} date: {value:?} (expected YYYY-MM-DD)")]
    BadDate { field: &'static str, value: String },
}

impl FilterCriteria {
    /// Build the next snapshot from `self` and a patch. `self` is untouched.
    pub fn apply(&self, patch: &FilterPatch) -> Result<FilterCriteria, FilterError> {
        let mut next = self.clone();
        if let Some(q) = &patch.search_query {
            next.search_query = q.clone();
        }
        if let Some(raw) = &patch.date_from {
            next.date_from = parse_date_field("date_from", raw)?;
        }
        if let Some(raw) = &patch.date_to {
            next.date_to = parse_date_field("date_to", raw)?;
        }
        if let Some(k) = patch.kind {
            next.kind = k;
        }
        Ok(next)
    }
}

fn parse_date_field(field: &'static str, raw: &str) -> Result<Option<NaiveDate>, FilterError> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FilterError::BadDate {
            field,
            value: raw.to_string(),
        })
}
