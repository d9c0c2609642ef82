// src/config.rs
//! Service configuration loaded from `config/dashboard.toml`.
//!
//! Every field has a default so a missing file still yields a runnable (if
//! unauthenticated) config. Secret fields follow the `"ENV"` convention: the
//! literal value `ENV` means "read from the environment variable".

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::AuthorPayoutPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";
pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";

pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_SHEET_ID: &str = "GOOGLE_SHEET_ID";
pub const ENV_SHEET_EMAIL: &str = "GOOGLE_SERVICE_ACCOUNT_EMAIL";
pub const ENV_SHEET_KEY: &str = "GOOGLE_PRIVATE_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub news_api: NewsApiConfig,
    pub storage: StorageConfig,
    pub analytics: AnalyticsConfig,
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub default_query: String,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2".to_string(),
            api_key: "ENV".to_string(),
            default_query: "technology".to_string(),
            language: "en".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding persisted preferences and payout rates.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/dashboard_state.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub author_payout_policy: AuthorPayoutPolicy,
    /// Offset (minutes east of UTC) used to cut articles into calendar days.
    pub day_offset_minutes: i32,
}

impl AnalyticsConfig {
    pub fn day_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.day_offset_minutes * 60)
            .or_else(|| FixedOffset::east_opt(0))
            .expect("zero offset is valid")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub service_account_email: String,
    pub private_key: String,
    /// A1 range the rows are appended after.
    pub range: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: "ENV".to_string(),
            service_account_email: "ENV".to_string(),
            private_key: "ENV".to_string(),
            range: "A:D".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://sheets.googleapis.com/v4".to_string(),
        }
    }
}

impl SheetsConfig {
    pub fn is_configured(&self) -> bool {
        !self.spreadsheet_id.is_empty()
            && !self.service_account_email.is_empty()
            && !self.private_key.is_empty()
    }
}

impl AppConfig {
    /// Load from `$DASHBOARD_CONFIG_PATH` or `config/dashboard.toml`.
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            if std::env::var(ENV_CONFIG_PATH).is_ok() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            tracing::info!(path = %path.display(), "no config file; using defaults");
            let mut cfg = Self::default();
            cfg.resolve_env();
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.resolve_env();
        Ok(cfg)
    }

    /// Parse without resolving `ENV` placeholders.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Replace `ENV` placeholders with environment values (empty if unset).
    pub fn resolve_env(&mut self) {
        resolve(&mut self.news_api.api_key, ENV_NEWS_API_KEY);
        resolve(&mut self.sheets.spreadsheet_id, ENV_SHEET_ID);
        resolve(&mut self.sheets.service_account_email, ENV_SHEET_EMAIL);
        resolve(&mut self.sheets.private_key, ENV_SHEET_KEY);
        // keys pasted into .env usually carry literal "\n"
        self.sheets.private_key = self.sheets.private_key.replace("\\n", "\n");
    }
}

fn resolve(field: &mut String, var: &str) {
    if field.trim().eq_ignore_ascii_case("env") {
        *field = std::env::var(var).unwrap_or_default();
    }
}
