//! Named range-filter presets for the payout table.

use serde::Serialize;

use crate::table::RangeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preset {
    pub key: &'static str,
    pub label: &'static str,
    pub filter: RangeFilter,
}

pub const DEFAULT_PRESET: &str = "all";

pub static PRESETS: [Preset; 4] = [
    Preset {
        key: "all",
        label: "All Time",
        filter: RangeFilter::UNBOUNDED,
    },
    // Despite the label, this preset carries no date bound.
    Preset {
        key: "week",
        label: "Last 7 Days",
        filter: RangeFilter {
            min_payout: Some(0.0),
            ..RangeFilter::UNBOUNDED
        },
    },
    Preset {
        key: "highValue",
        label: "High Value Authors",
        filter: RangeFilter {
            min_articles: Some(5),
            min_payout: Some(100.0),
            ..RangeFilter::UNBOUNDED
        },
    },
    Preset {
        key: "newAuthors",
        label: "New Authors",
        filter: RangeFilter {
            max_articles: Some(3),
            ..RangeFilter::UNBOUNDED
        },
    },
];

pub fn find(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.key == key)
}
