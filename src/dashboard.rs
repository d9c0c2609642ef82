// src/dashboard.rs
//! # Dashboard
//! Application state behind the HTTP routes: the live filter snapshot, the
//! article feed and the payout table controller.
//!
//! Every filter change or refresh starts a fetch tagged with a sequence
//! number. Fetches are not serialized; when one completes, its result is
//! applied only if no newer fetch has been applied already, so the latest
//! request always wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{self, AuthorAggregate, DailyTrend, SourceAggregate, Totals, TOP_N};
use crate::article::Article;
use crate::config::AnalyticsConfig;
use crate::filters::{FilterCriteria, FilterError, FilterPatch};
use crate::news_api::ArticleSource;
use crate::rates::RateStore;
use crate::table::{TableAction, TableController, TableError, TableView};

/// The one message users see for any failed fetch.
pub const FETCH_FAILED: &str = "Failed to fetch news";

const RECENT_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedStatus {
    Loading,
    Ready(Arc<Vec<Article>>),
    Failed(String),
}

/// Serializable summary of the feed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FeedSummary {
    Loading,
    Ready { articles: usize },
    Failed { error: String },
}

impl From<&FeedStatus> for FeedSummary {
    fn from(s: &FeedStatus) -> Self {
        match s {
            FeedStatus::Loading => FeedSummary::Loading,
            FeedStatus::Ready(a) => FeedSummary::Ready { articles: a.len() },
            FeedStatus::Failed(e) => FeedSummary::Failed { error: e.clone() },
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("news feed is still loading")]
    Loading,
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsView {
    pub top_authors: Vec<AuthorAggregate>,
    pub top_sources: Vec<SourceAggregate>,
    pub trend: DailyTrend,
    pub summary: Summary,
    pub recent: Vec<Article>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub authors: usize,
    pub totals: Totals,
}

struct FetchTicket {
    seq: u64,
    criteria: FilterCriteria,
}

struct Feed {
    status: FeedStatus,
    applied_seq: u64,
}

pub struct Dashboard {
    source: Arc<dyn ArticleSource>,
    rates: Arc<RateStore>,
    analytics: AnalyticsConfig,
    criteria: RwLock<FilterCriteria>,
    feed: RwLock<Feed>,
    next_seq: AtomicU64,
    table: Mutex<TableController>,
}

impl Dashboard {
    /// Starts in `Loading`; call [`Dashboard::refresh`] for the first fetch.
    pub fn new(
        source: Arc<dyn ArticleSource>,
        rates: Arc<RateStore>,
        analytics: AnalyticsConfig,
    ) -> Self {
        Self {
            source,
            rates,
            analytics,
            criteria: RwLock::new(FilterCriteria::default()),
            feed: RwLock::new(Feed {
                status: FeedStatus::Loading,
                applied_seq: 0,
            }),
            next_seq: AtomicU64::new(0),
            table: Mutex::new(TableController::new()),
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria.read().expect("criteria poisoned").clone()
    }

    pub fn status(&self) -> FeedStatus {
        self.feed.read().expect("feed poisoned").status.clone()
    }

    /// Merge `patch` into a new criteria snapshot and refetch with it.
    pub async fn update_filters(&self, patch: FilterPatch) -> Result<FeedSummary, DashboardError> {
        let ticket = self.begin_update(&patch)?;
        Ok(self.run(ticket).await)
    }

    /// Fetch with the current criteria and apply the result unless a newer
    /// fetch has already landed.
    pub async fn refresh(&self) -> FeedSummary {
        let ticket = self.begin_refresh();
        self.run(ticket).await
    }

    // The sequence number is taken under the criteria lock so a higher
    // sequence always carries a snapshot at least as new.
    fn begin_update(&self, patch: &FilterPatch) -> Result<FetchTicket, FilterError> {
        let mut c = self.criteria.write().expect("criteria poisoned");
        let next = c.apply(patch)?;
        *c = next;
        Ok(FetchTicket {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst) + 1,
            criteria: c.clone(),
        })
    }

    fn begin_refresh(&self) -> FetchTicket {
        let c = self.criteria.read().expect("criteria poisoned");
        FetchTicket {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst) + 1,
            criteria: c.clone(),
        }
    }

    async fn run(&self, ticket: FetchTicket) -> FeedSummary {
        let FetchTicket { seq, criteria } = ticket;
        {
            let mut f = self.feed.write().expect("feed poisoned");
            if seq > f.applied_seq {
                f.status = FeedStatus::Loading;
            }
        }

        counter!("news_fetch_total", "source" => self.source.name()).increment(1);
        let result = self.source.fetch(&criteria).await;

        let mut f = self.feed.write().expect("feed poisoned");
        if seq < f.applied_seq {
            counter!("news_fetch_stale_total").increment(1);
            debug!(target: "fetch", seq, applied = f.applied_seq, "discarding stale fetch result");
            return FeedSummary::from(&f.status);
        }

        f.applied_seq = seq;
        f.status = match result {
            Ok(mut articles) => {
                articles.retain(|a| criteria.kind.matches(a));
                info!(target: "fetch", seq, count = articles.len(), "feed updated");
                FeedStatus::Ready(Arc::new(articles))
            }
            Err(e) => {
                counter!("news_fetch_errors_total", "source" => self.source.name()).increment(1);
                warn!(target: "fetch", seq, error = %e, "news fetch failed");
                FeedStatus::Failed(FETCH_FAILED.to_string())
            }
        };
        FeedSummary::from(&f.status)
    }

    /// Articles of the applied feed, or why there are none to show.
    pub fn articles(&self) -> Result<Arc<Vec<Article>>, DashboardError> {
        match self.status() {
            FeedStatus::Ready(a) => Ok(a),
            FeedStatus::Loading => Err(DashboardError::Loading),
            FeedStatus::Failed(msg) => Err(DashboardError::Failed(msg)),
        }
    }

    /// Full author aggregate at the current rates.
    pub fn author_rows(&self) -> Result<Vec<AuthorAggregate>, DashboardError> {
        let articles = self.articles()?;
        Ok(aggregate::by_author(
            &articles,
            &self.rates.get(),
            self.analytics.author_payout_policy,
        ))
    }

    pub fn analytics(&self) -> Result<AnalyticsView, DashboardError> {
        let articles = self.articles()?;
        let rates = self.rates.get();
        let rows = aggregate::by_author(&articles, &rates, self.analytics.author_payout_policy);
        Ok(AnalyticsView {
            top_authors: aggregate::top_authors(&rows, TOP_N),
            top_sources: aggregate::by_source(&articles),
            trend: aggregate::by_day_in(&articles, &rates, self.analytics.day_offset()),
            summary: Summary {
                authors: rows.len(),
                totals: aggregate::totals(&rows),
            },
            recent: articles.iter().take(RECENT_COUNT).cloned().collect(),
        })
    }

    pub fn table_view(&self) -> Result<TableView, DashboardError> {
        let rows = self.author_rows()?;
        Ok(self.table.lock().expect("table poisoned").view(&rows))
    }

    /// Apply a table action, then render. The action sticks even while the
    /// feed is unavailable.
    pub fn apply_table_action(&self, action: TableAction) -> Result<TableView, DashboardError> {
        self.table.lock().expect("table poisoned").apply(action)?;
        self.table_view()
    }
}
