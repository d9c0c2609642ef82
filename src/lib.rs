// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod article;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod filters;
pub mod metrics;
pub mod news_api;
pub mod preferences;
pub mod presets;
pub mod rates;
pub mod session;
pub mod storage;
pub mod table;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
