//! # Table Controller
//! Local search / range filter / sort / paginate over per-author rows.
//! Never triggers a refetch.
//!
//! Stages run in a fixed order: text search, range filters, sort, page slice.
//! Sorting always starts from the aggregation order, so ties keep first-seen
//! order in both directions.
//!
//! Page policy: the page index resets to 0 when the page size changes, and
//! when the filtered row set no longer reaches the current page's start
//! offset.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{self, AuthorAggregate, Totals};
use crate::presets::{self, DEFAULT_PRESET};

pub const PAGE_SIZES: [usize; 3] = [5, 10, 25];
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Inclusive numeric bounds; `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    #[serde(default)]
    pub min_articles: Option<u64>,
    #[serde(default)]
    pub max_articles: Option<u64>,
    #[serde(default)]
    pub min_payout: Option<f64>,
    #[serde(default)]
    pub max_payout: Option<f64>,
}

impl RangeFilter {
    pub const UNBOUNDED: RangeFilter = RangeFilter {
        min_articles: None,
        max_articles: None,
        min_payout: None,
        max_payout: None,
    };

    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }

    pub fn matches(&self, row: &AuthorAggregate) -> bool {
        self.min_articles.map_or(true, |m| row.article_count >= m)
            && self.max_articles.map_or(true, |m| row.article_count <= m)
            && self.min_payout.map_or(true, |m| row.total_payout >= m)
            && self.max_payout.map_or(true, |m| row.total_payout <= m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Author,
    ArticleCount,
    Payout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// One user interaction with the table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TableAction {
    Search { query: String },
    Range(RangeFilter),
    Preset { key: String },
    Sort { key: SortKey },
    Page { page: usize },
    PageSize { size: usize },
    ToggleFilters,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown preset {0:?}")]
    UnknownPreset(String),
    #[error("unsupported page size {0} (allowed: 5, 10, 25)")]
    BadPageSize(usize),
}

/// What the table renders for the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub rows: Vec<AuthorAggregate>,
    /// Rows after search + range filters (pagination count).
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_sizes: [usize; 3],
    pub sort: Option<SortState>,
    pub search: String,
    pub range: RangeFilter,
    pub preset: String,
    pub filters_open: bool,
    /// Footer totals over the filtered rows (all pages).
    pub filtered_totals: Totals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableController {
    search: String,
    range: RangeFilter,
    preset: String,
    filters_open: bool,
    sort: Option<SortState>,
    page: usize,
    page_size: usize,
}

impl Default for TableController {
    fn default() -> Self {
        Self {
            search: String::new(),
            range: RangeFilter::UNBOUNDED,
            preset: DEFAULT_PRESET.to_string(),
            filters_open: false,
            sort: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: TableAction) -> Result<(), TableError> {
        match action {
            TableAction::Search { query } => self.set_search(query),
            TableAction::Range(r) => self.set_range(r),
            TableAction::Preset { key } => self.select_preset(&key)?,
            TableAction::Sort { key } => self.request_sort(key),
            TableAction::Page { page } => self.set_page(page),
            TableAction::PageSize { size } => self.set_page_size(size)?,
            TableAction::ToggleFilters => self.filters_open = !self.filters_open,
        }
        Ok(())
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn set_range(&mut self, range: RangeFilter) {
        self.range = range;
    }

    /// Overwrite all four range fields with the preset and open the panel.
    pub fn select_preset(&mut self, key: &str) -> Result<(), TableError> {
        let p = presets::find(key).ok_or_else(|| TableError::UnknownPreset(key.to_string()))?;
        self.preset = p.key.to_string();
        self.range = p.filter;
        self.filters_open = true;
        Ok(())
    }

    /// Header click: same key flips direction, a new key starts ascending.
    pub fn request_sort(&mut self, key: SortKey) {
        let direction = match self.sort {
            Some(s) if s.key == key && s.direction == SortDirection::Asc => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        self.sort = Some(SortState { key, direction });
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), TableError> {
        if !PAGE_SIZES.contains(&size) {
            return Err(TableError::BadPageSize(size));
        }
        self.page_size = size;
        self.page = 0;
        Ok(())
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Run the pipeline over `rows` and reconcile the page index.
    pub fn view(&mut self, rows: &[AuthorAggregate]) -> TableView {
        let mut visible = filter_rows(rows, &self.search, &self.range);
        if let Some(s) = self.sort {
            sort_rows(&mut visible, s);
        }

        let total_count = visible.len();
        let offset = match self.page.checked_mul(self.page_size) {
            Some(o) if self.page == 0 || o < total_count => o,
            _ => {
                self.page = 0;
                0
            }
        };
        let filtered_totals = aggregate::totals(&visible);
        let page_rows = visible
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();

        TableView {
            rows: page_rows,
            total_count,
            page: self.page,
            page_size: self.page_size,
            page_sizes: PAGE_SIZES,
            sort: self.sort,
            search: self.search.clone(),
            range: self.range,
            preset: self.preset.clone(),
            filters_open: self.filters_open,
            filtered_totals,
        }
    }
}

/// Text search then range filter. Order of `rows` is preserved.
pub fn filter_rows(rows: &[AuthorAggregate], search: &str, range: &RangeFilter) -> Vec<AuthorAggregate> {
    let needle = search.to_lowercase();
    rows.iter()
        .filter(|r| matches_search(r, &needle))
        .filter(|r| range.matches(r))
        .cloned()
        .collect()
}

fn matches_search(row: &AuthorAggregate, needle: &str) -> bool {
    needle.is_empty()
        || row.author.to_lowercase().contains(needle)
        || row.article_count.to_string().contains(needle)
        || row.total_payout.to_string().contains(needle)
}

/// Stable sort by the given key and direction.
pub fn sort_rows(rows: &mut [AuthorAggregate], sort: SortState) {
    rows.sort_by(|a, b| {
        let ord = compare(a, b, sort.key);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn compare(a: &AuthorAggregate, b: &AuthorAggregate, key: SortKey) -> Ordering {
    match key {
        SortKey::Author => a.author.cmp(&b.author),
        SortKey::ArticleCount => a.article_count.cmp(&b.article_count),
        SortKey::Payout => a.total_payout.total_cmp(&b.total_payout),
    }
}
