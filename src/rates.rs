//! # Rate Store
//! Persisted payout rates per article type, with a two-phase update:
//! `stage` (edit buffer) → `confirm` (user accepted the dialog) → `commit`.
//!
//! A commit coerces both staged values, then writes both rates at once; if
//! either value is rejected nothing changes.

use std::sync::{Arc, Mutex, RwLock};

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::article::ArticleKind;
use crate::storage::KeyValueStore;

/// Storage key of the JSON-encoded rate mapping.
pub const RATES_KEY: &str = "payoutRates";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    pub news: f64,
    pub blog: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            news: 10.0,
            blog: 15.0,
        }
    }
}

impl RateConfig {
    pub fn rate_for(&self, kind: ArticleKind) -> f64 {
        match kind {
            ArticleKind::News => self.news,
            ArticleKind::Blog => self.blog,
        }
    }
}

/// Raw values as typed into the edit form; coerced at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDraft {
    pub news: String,
    pub blog: String,
}

impl From<RateConfig> for RateDraft {
    fn from(r: RateConfig) -> Self {
        Self {
            news: r.news.to_string(),
            blog: r.blog.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    pub draft: RateDraft,
    pub confirmed: bool,
}

#[derive(Debug, Error)]
pub enum RateError {
    #[error("no rate change has been staged")]
    NothingStaged,
    #[error("rate change has not been confirmed")]
    NotConfirmed,
    #[error("invalid {field} rate: {value:?}")]
    Invalid { field: &'static str, value: String },
    #[error("failed to persist rates: {0}")]
    Persist(anyhow::Error),
}

pub struct RateStore {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<RateConfig>,
    pending: Mutex<Option<PendingChange>>,
}

impl RateStore {
    /// Load rates from the store, falling back to defaults when the entry is
    /// missing or unreadable.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let current = match store.get(RATES_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "stored payout rates unreadable; using defaults");
                RateConfig::default()
            }),
            None => RateConfig::default(),
        };
        Self {
            store,
            current: RwLock::new(current),
            pending: Mutex::new(None),
        }
    }

    pub fn get(&self) -> RateConfig {
        *self.current.read().expect("rates rwlock poisoned")
    }

    pub fn pending(&self) -> Option<PendingChange> {
        self.pending.lock().expect("rates mutex poisoned").clone()
    }

    /// Replace the edit buffer. Any earlier confirmation is dropped.
    pub fn stage(&self, draft: RateDraft) {
        *self.pending.lock().expect("rates mutex poisoned") = Some(PendingChange {
            draft,
            confirmed: false,
        });
    }

    /// Mark the staged values as accepted by the user.
    pub fn confirm(&self) -> Result<PendingChange, RateError> {
        let mut g = self.pending.lock().expect("rates mutex poisoned");
        let p = g.as_mut().ok_or(RateError::NothingStaged)?;
        p.confirmed = true;
        Ok(p.clone())
    }

    pub fn cancel(&self) {
        *self.pending.lock().expect("rates mutex poisoned") = None;
    }

    /// Apply a confirmed change: coerce, persist, swap. The edit buffer is
    /// cleared only on success.
    pub fn commit(&self) -> Result<RateConfig, RateError> {
        let mut pending = self.pending.lock().expect("rates mutex poisoned");
        let p = pending.as_ref().ok_or(RateError::NothingStaged)?;
        if !p.confirmed {
            return Err(RateError::NotConfirmed);
        }

        let next = RateConfig {
            news: coerce_rate("news", &p.draft.news)?,
            blog: coerce_rate("blog", &p.draft.blog)?,
        };

        let body = serde_json::to_string(&next).map_err(|e| RateError::Persist(e.into()))?;
        self.store
            .set(RATES_KEY, &body)
            .map_err(RateError::Persist)?;

        *self.current.write().expect("rates rwlock poisoned") = next;
        *pending = None;

        counter!("rates_commits_total").increment(1);
        info!(news = next.news, blog = next.blog, "payout rates updated");
        Ok(next)
    }
}

/// Numeric coercion of a form value. Blank, non-numeric, negative and
/// non-finite input is rejected.
pub fn coerce_rate(field: &'static str, raw: &str) -> Result<f64, RateError> {
    let invalid = || RateError::Invalid {
        field,
        value: raw.to_string(),
    };
    let v: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !v.is_finite() || v < 0.0 {
        return Err(invalid());
    }
    Ok(v)
}
