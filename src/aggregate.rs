//! # Aggregation Engine
//! Pure reductions over a fetched article list: per-author payouts, per-source
//! distribution and per-day payout trend. No I/O, deterministic, suitable for
//! unit tests and offline report generation.
//!
//! Policy: the author table pays every article at the `news` rate regardless
//! of its type ([`AuthorPayoutPolicy::UniformNewsRate`]), while the daily trend
//! pays each article at the rate of its own type. The two totals can therefore
//! differ for the same article list. `PerArticleType` is available as an
//! explicit opt-in fix.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::rates::RateConfig;

/// Number of entries in the "top" charts (authors, sources).
pub const TOP_N: usize = 5;

/// How author payouts are priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorPayoutPolicy {
    /// Every article is paid at the news rate.
    #[default]
    UniformNewsRate,
    /// Each article is paid at the rate of its own type.
    PerArticleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorAggregate {
    pub author: String,
    pub article_count: u64,
    pub total_payout: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAggregate {
    pub name: String,
    pub article_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub article_count: u64,
    pub total_payout: f64,
}

/// Daily buckets plus the number of articles whose timestamp did not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
    pub days: Vec<DailyAggregate>,
    pub undated: u64,
    pub totals: Totals,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub articles: u64,
    pub payout: f64,
}

/// Group by author (first-seen order) and accumulate count + payout.
pub fn by_author(
    articles: &[Article],
    rates: &RateConfig,
    policy: AuthorPayoutPolicy,
) -> Vec<AuthorAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<AuthorAggregate> = Vec::new();

    for a in articles {
        let name = a.author_or_unknown();
        let rate = match policy {
            AuthorPayoutPolicy::UniformNewsRate => rates.news,
            AuthorPayoutPolicy::PerArticleType => rates.rate_for(a.effective_kind()),
        };
        let i = *index.entry(name).or_insert_with(|| {
            rows.push(AuthorAggregate {
                author: name.to_string(),
                article_count: 0,
                total_payout: 0.0,
            });
            rows.len() - 1
        });
        rows[i].article_count += 1;
        rows[i].total_payout += rate;
    }
    rows
}

/// Top authors by article count, descending; ties keep first-seen order.
pub fn top_authors(rows: &[AuthorAggregate], n: usize) -> Vec<AuthorAggregate> {
    let mut out = rows.to_vec();
    out.sort_by(|a, b| b.article_count.cmp(&a.article_count));
    out.truncate(n);
    out
}

/// Group by source name and keep the `TOP_N` largest (stable on ties).
pub fn by_source(articles: &[Article]) -> Vec<SourceAggregate> {
    let mut out = count_sources(articles);
    out.sort_by(|a, b| b.article_count.cmp(&a.article_count));
    out.truncate(TOP_N);
    out
}

/// Full source distribution in first-seen order.
pub fn count_sources(articles: &[Article]) -> Vec<SourceAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<SourceAggregate> = Vec::new();
    for a in articles {
        let name = a.source_or_unknown();
        let i = *index.entry(name).or_insert_with(|| {
            rows.push(SourceAggregate {
                name: name.to_string(),
                article_count: 0,
            });
            rows.len() - 1
        });
        rows[i].article_count += 1;
    }
    rows
}

/// Daily trend using UTC calendar dates.
pub fn by_day(articles: &[Article], rates: &RateConfig) -> DailyTrend {
    by_day_in(articles, rates, FixedOffset::east_opt(0).expect("zero offset"))
}

/// Daily trend with calendar dates taken in the given fixed offset.
pub fn by_day_in(articles: &[Article], rates: &RateConfig, offset: FixedOffset) -> DailyTrend {
    let mut buckets: HashMap<NaiveDate, (u64, f64)> = HashMap::new();
    let mut undated = 0u64;

    for a in articles {
        let Some(ts) = parse_published(&a.published_at) else {
            undated += 1;
            continue;
        };
        let date = ts.with_timezone(&offset).date_naive();
        let slot = buckets.entry(date).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += rates.rate_for(a.effective_kind());
    }

    let mut days: Vec<DailyAggregate> = buckets
        .into_iter()
        .map(|(date, (article_count, total_payout))| DailyAggregate {
            date,
            article_count,
            total_payout,
        })
        .collect();
    days.sort_by_key(|d| d.date);

    let totals = Totals {
        articles: days.iter().map(|d| d.article_count).sum(),
        payout: days.iter().map(|d| d.total_payout).sum(),
    };
    DailyTrend {
        days,
        undated,
        totals,
    }
}

/// Sum counts and payouts over author rows.
pub fn totals(rows: &[AuthorAggregate]) -> Totals {
    rows.iter().fold(Totals::default(), |acc, r| Totals {
        articles: acc.articles + r.article_count,
        payout: acc.payout + r.total_payout,
    })
}

/// Parse an upstream `publishedAt` value. Accepts RFC 3339, a naive
/// `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare date.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ArticleKind, SourceRef};

    fn art(author: Option<&str>, source: Option<&str>, ts: &str, kind: Option<ArticleKind>) -> Article {
        Article {
            title: "t".into(),
            author: author.map(str::to_string),
            source: source.map(|n| SourceRef {
                id: None,
                name: n.to_string(),
            }),
            published_at: ts.into(),
            kind,
            url: None,
            description: None,
        }
    }

    fn rates() -> RateConfig {
        RateConfig {
            news: 10.0,
            blog: 15.0,
        }
    }

    #[test]
    fn author_payout_uses_news_rate_uniformly() {
        let list = vec![
            art(Some("A"), None, "", Some(ArticleKind::News)),
            art(Some("A"), None, "", Some(ArticleKind::News)),
            art(Some("B"), None, "", Some(ArticleKind::Blog)),
        ];
        let rows = by_author(&list, &rates(), AuthorPayoutPolicy::UniformNewsRate);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].author.as_str(), rows[0].article_count), ("A", 2));
        assert_eq!(rows[0].total_payout, 20.0);
        assert_eq!((rows[1].author.as_str(), rows[1].article_count), ("B", 1));
        assert_eq!(rows[1].total_payout, 10.0);
        assert_eq!(totals(&rows).payout, 30.0);
    }

    #[test]
    fn per_type_policy_prices_blogs_at_blog_rate() {
        let list = vec![art(Some("B"), None, "", Some(ArticleKind::Blog))];
        let rows = by_author(&list, &rates(), AuthorPayoutPolicy::PerArticleType);
        assert_eq!(rows[0].total_payout, 15.0);
    }

    #[test]
    fn missing_author_groups_under_unknown() {
        let list = vec![art(None, None, "", None), art(Some(""), None, "", None)];
        let rows = by_author(&list, &rates(), AuthorPayoutPolicy::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, "Unknown");
        assert_eq!(rows[0].article_count, 2);
    }

    #[test]
    fn top_sources_are_capped_and_stable_on_ties() {
        let mut list = Vec::new();
        for name in ["S1", "S2", "S3", "S4", "S5", "S6"] {
            list.push(art(None, Some(name), "", None));
        }
        list.push(art(None, Some("S6"), "", None));
        list.push(art(None, None, "", None));

        let top = by_source(&list);
        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0].name, "S6");
        assert_eq!(top[0].article_count, 2);
        let rest: Vec<&str> = top[1..].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(rest, vec!["S1", "S2", "S3", "S4"]);
    }

    #[test]
    fn daily_trend_is_ascending_and_type_aware() {
        let list = vec![
            art(Some("A"), None, "2024-05-02T09:00:00Z", Some(ArticleKind::Blog)),
            art(Some("A"), None, "2024-05-01T23:30:00Z", None),
            art(Some("B"), None, "2024-05-02T10:00:00Z", Some(ArticleKind::News)),
            art(Some("C"), None, "not a date", None),
        ];
        let trend = by_day(&list, &rates());
        assert_eq!(trend.days.len(), 2);
        assert_eq!(trend.days[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(trend.days[0].total_payout, 10.0);
        assert_eq!(trend.days[1].article_count, 2);
        assert_eq!(trend.days[1].total_payout, 25.0);
        assert_eq!(trend.undated, 1);
        assert_eq!(trend.totals.articles, 3);
    }

    #[test]
    fn offset_moves_articles_across_midnight() {
        let list = vec![art(None, None, "2024-05-01T23:30:00Z", None)];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let trend = by_day_in(&list, &rates(), plus_two);
        assert_eq!(trend.days[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }

    #[test]
    fn parse_published_accepts_common_shapes() {
        assert!(parse_published("2024-05-01T10:00:00Z").is_some());
        assert!(parse_published("2024-05-01T10:00:00+02:00").is_some());
        assert!(parse_published("2024-05-01T10:00:00").is_some());
        assert!(parse_published("2024-05-01").is_some());
        assert!(parse_published("").is_none());
    }
}
