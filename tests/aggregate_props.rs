// tests/aggregate_props.rs
//
// Seeded property checks for the aggregation engine and the end-to-end
// scenarios (A/A/B pricing, empty feed).

use rand::{rngs::StdRng, Rng, SeedableRng};

use news_payout_dashboard::aggregate::{self, AuthorPayoutPolicy};
use news_payout_dashboard::article::{Article, ArticleKind, SourceRef};
use news_payout_dashboard::rates::RateConfig;
use news_payout_dashboard::table::TableController;

const AUTHORS: [Option<&str>; 6] = [
    Some("Ann"),
    Some("Bo"),
    Some("Cy"),
    Some("Doe, Jane"),
    Some(""),
    None,
];
const SOURCES: [Option<&str>; 4] = [Some("Wired"), Some("Verge"), Some("Blog"), None];
const KINDS: [Option<ArticleKind>; 3] = [Some(ArticleKind::News), Some(ArticleKind::Blog), None];

fn article(author: Option<&str>, kind: Option<ArticleKind>) -> Article {
    Article {
        title: "t".into(),
        author: author.map(str::to_string),
        source: None,
        published_at: "2024-05-01T12:00:00Z".into(),
        kind,
        url: None,
        description: None,
    }
}

fn random_feed(rng: &mut StdRng) -> Vec<Article> {
    let n = rng.random_range(0..40);
    (0..n)
        .map(|_| {
            let day = rng.random_range(1..=9);
            let hour = rng.random_range(0..24);
            Article {
                title: "t".into(),
                author: AUTHORS[rng.random_range(0..AUTHORS.len())].map(str::to_string),
                source: SOURCES[rng.random_range(0..SOURCES.len())].map(|s| SourceRef {
                    id: None,
                    name: s.to_string(),
                }),
                published_at: format!("2024-05-0{day}T{hour:02}:15:00Z"),
                kind: KINDS[rng.random_range(0..KINDS.len())],
                url: None,
                description: None,
            }
        })
        .collect()
}

fn random_rates(rng: &mut StdRng) -> RateConfig {
    RateConfig {
        news: f64::from(rng.random_range(0..50_u32)),
        blog: f64::from(rng.random_range(0..50_u32)),
    }
}

#[test]
fn author_counts_sum_to_feed_length() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let feed = random_feed(&mut rng);
        let rates = random_rates(&mut rng);
        for policy in [AuthorPayoutPolicy::UniformNewsRate, AuthorPayoutPolicy::PerArticleType] {
            let rows = aggregate::by_author(&feed, &rates, policy);
            let sum: u64 = rows.iter().map(|r| r.article_count).sum();
            assert_eq!(sum, feed.len() as u64);
        }
    }
}

#[test]
fn uniform_policy_pays_every_article_at_news_rate() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let feed = random_feed(&mut rng);
        let rates = random_rates(&mut rng);
        for row in aggregate::by_author(&feed, &rates, AuthorPayoutPolicy::UniformNewsRate) {
            assert_eq!(row.total_payout, row.article_count as f64 * rates.news);
        }
    }
}

#[test]
fn daily_payout_is_sum_of_per_type_rates() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..200 {
        let feed = random_feed(&mut rng);
        let rates = random_rates(&mut rng);
        let trend = aggregate::by_day(&feed, &rates);

        for day in &trend.days {
            let key = day.date.format("%Y-%m-%d").to_string();
            let expected: f64 = feed
                .iter()
                .filter(|a| a.published_at.starts_with(&key))
                .map(|a| rates.rate_for(a.effective_kind()))
                .sum();
            assert_eq!(day.total_payout, expected, "day {key}");
        }
        assert!(trend.days.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(trend.totals.articles + trend.undated, feed.len() as u64);
    }
}

#[test]
fn source_counts_cover_feed_and_top_list_is_capped() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let feed = random_feed(&mut rng);
        let all = aggregate::count_sources(&feed);
        let total: u64 = all.iter().map(|s| s.article_count).sum();
        assert_eq!(total, feed.len() as u64);

        let top = aggregate::by_source(&feed);
        assert!(top.len() <= aggregate::TOP_N);
        assert!(top.windows(2).all(|w| w[0].article_count >= w[1].article_count));
    }
}

#[test]
fn scenario_a_a_b_prices_everything_at_news_rate() {
    let feed = vec![
        article(Some("A"), Some(ArticleKind::News)),
        article(Some("A"), Some(ArticleKind::News)),
        article(Some("B"), Some(ArticleKind::Blog)),
    ];
    let rates = RateConfig {
        news: 10.0,
        blog: 15.0,
    };
    let rows = aggregate::by_author(&feed, &rates, AuthorPayoutPolicy::default());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].author, "A");
    assert_eq!(rows[0].article_count, 2);
    assert_eq!(rows[0].total_payout, 20.0);
    assert_eq!(rows[1].author, "B");
    assert_eq!(rows[1].article_count, 1);
    assert_eq!(rows[1].total_payout, 10.0);
    assert_eq!(aggregate::totals(&rows).payout, 30.0);
}

#[test]
fn empty_feed_yields_empty_everything() {
    let rates = RateConfig::default();
    let rows = aggregate::by_author(&[], &rates, AuthorPayoutPolicy::default());
    assert!(rows.is_empty());
    let t = aggregate::totals(&rows);
    assert_eq!((t.articles, t.payout), (0, 0.0));
    assert!(aggregate::by_source(&[]).is_empty());
    assert!(aggregate::by_day(&[], &rates).days.is_empty());

    let view = TableController::new().view(&rows);
    assert!(view.rows.is_empty());
    assert_eq!(view.total_count, 0);
}
