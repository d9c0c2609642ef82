//! # Article Model
//! Schema for records returned by the upstream news API.
//!
//! Upstream data is loosely shaped: `author`, `source` and `type` may be
//! missing or `null`. They stay optional here; the single substitution policy
//! ("Unknown" for names, `news` for type) lives in the accessors below and is
//! applied by the aggregation layer only.

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder used when an article has no author or source name.
pub const UNKNOWN: &str = "Unknown";

/// Payout category of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    News,
    Blog,
}

impl ArticleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleKind::News => "news",
            ArticleKind::Blog => "blog",
        }
    }
}

/// Publisher reference as sent by the news API (`{ "id": ..., "name": ... }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

/// One news/blog item. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source: Option<SourceRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub published_at: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<ArticleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Article {
    /// Author name, or [`UNKNOWN`] when absent or empty.
    pub fn author_or_unknown(&self) -> &str {
        non_empty(self.author.as_deref()).unwrap_or(UNKNOWN)
    }

    /// Source name, or [`UNKNOWN`] when absent or empty.
    pub fn source_or_unknown(&self) -> &str {
        non_empty(self.source.as_ref().map(|s| s.name.as_str())).unwrap_or(UNKNOWN)
    }

    /// Payout category; untyped articles are paid as news.
    pub fn effective_kind(&self) -> ArticleKind {
        self.kind.unwrap_or(ArticleKind::News)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn null_as_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

// Anything other than "news"/"blog" is treated as untyped.
fn lenient_kind<'de, D>(de: D) -> Result<Option<ArticleKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("news") => Some(ArticleKind::News),
        Some("blog") => Some(ArticleKind::Blog),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_newsapi_shape_with_nulls() {
        let raw = r#"{
            "source": { "id": null, "name": "The Verge" },
            "author": null,
            "title": null,
            "url": "https://example.com/a",
            "publishedAt": "2024-05-01T10:00:00Z"
        }"#;
        let a: Article = serde_json::from_str(raw).unwrap();
        assert_eq!(a.title, "");
        assert_eq!(a.author_or_unknown(), UNKNOWN);
        assert_eq!(a.source_or_unknown(), "The Verge");
        assert_eq!(a.effective_kind(), ArticleKind::News);
    }

    #[test]
    fn unknown_type_is_untyped() {
        let a: Article =
            serde_json::from_str(r#"{"title":"x","publishedAt":"","type":"video"}"#).unwrap();
        assert_eq!(a.kind, None);
        let b: Article =
            serde_json::from_str(r#"{"title":"x","publishedAt":"","type":"Blog"}"#).unwrap();
        assert_eq!(b.kind, Some(ArticleKind::Blog));
    }

    #[test]
    fn empty_names_fall_back_to_unknown() {
        let a = Article {
            title: "t".into(),
            author: Some(String::new()),
            source: Some(SourceRef {
                id: None,
                name: String::new(),
            }),
            published_at: String::new(),
            kind: None,
            url: None,
            description: None,
        };
        assert_eq!(a.author_or_unknown(), UNKNOWN);
        assert_eq!(a.source_or_unknown(), UNKNOWN);
    }
}
