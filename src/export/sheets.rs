// src/export/sheets.rs
//! Remote spreadsheet append: one `[author, articles, payout, date]` row per
//! author. Authenticates as a Google service account (RS256 JWT exchanged
//! for a bearer token), then calls `values:append`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::format_money;
use crate::aggregate::AuthorAggregate;
use crate::config::SheetsConfig;

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub author: String,
    pub articles: u64,
    pub payout: String,
    pub date: String,
}

impl SheetRow {
    pub fn from_aggregate(a: &AuthorAggregate, date: &str) -> Self {
        Self {
            author: a.author.clone(),
            articles: a.article_count,
            payout: format_money(a.total_payout),
            date: date.to_string(),
        }
    }

    fn values(&self) -> serde_json::Value {
        json!([self.author, self.articles, self.payout, self.date])
    }
}

/// `5/1/2024` style capture date.
pub fn capture_date(d: NaiveDate) -> String {
    d.format("%-m/%-d/%Y").to_string()
}

#[async_trait]
pub trait SheetSink: Send + Sync {
    /// Append rows after the configured range; returns the number appended.
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<usize>;
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct GoogleSheetsSink {
    http: reqwest::Client,
    cfg: SheetsConfig,
    key: EncodingKey,
}

impl GoogleSheetsSink {
    /// Fails if the private key is not a valid RSA PEM.
    pub fn new(cfg: &SheetsConfig) -> Result<Self> {
        if !cfg.is_configured() {
            return Err(anyhow!("spreadsheet credentials are incomplete"));
        }
        let key = EncodingKey::from_rsa_pem(cfg.private_key.as_bytes())
            .context("parsing service account private key")?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("news-payout-dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
            key,
        })
    }

    fn assertion(&self) -> Result<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before UNIX epoch")?
            .as_secs();
        let claims = Claims {
            iss: &self.cfg.service_account_email,
            scope: SCOPE,
            aud: &self.cfg.token_url,
            iat,
            exp: iat + 3600,
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }

    async fn access_token(&self) -> Result<String> {
        let assertion = self.assertion()?;
        let rsp = self
            .http
            .post(&self.cfg.token_url)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("token request")?
            .error_for_status()
            .context("token endpoint rejected assertion")?;
        let tok: TokenResponse = rsp.json().await.context("decoding token response")?;
        Ok(tok.access_token)
    }

    fn append_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.cfg.api_base.trim_end_matches('/'),
            self.cfg.spreadsheet_id,
            self.cfg.range
        )
    }
}

#[async_trait]
impl SheetSink for GoogleSheetsSink {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<usize> {
        let token = self.access_token().await?;
        let values: Vec<serde_json::Value> = rows.iter().map(SheetRow::values).collect();
        self.http
            .post(self.append_url())
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .context("append request")?
            .error_for_status()
            .context("spreadsheet append rejected")?;
        debug!(rows = rows.len(), "appended rows to spreadsheet");
        Ok(rows.len())
    }
}

// --- Test helper ---
/// Records appended rows in memory; optionally fails every call.
#[derive(Default)]
pub struct MemorySheet {
    pub appended: std::sync::Mutex<Vec<SheetRow>>,
    pub fail: bool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SheetSink for MemorySheet {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<usize> {
        if self.fail {
            return Err(anyhow!("sheet unavailable"));
        }
        self.appended
            .lock()
            .map_err(|_| anyhow!("sheet lock poisoned"))?
            .extend_from_slice(rows);
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_date_is_month_day_year() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(capture_date(d), "5/1/2024");
    }

    #[test]
    fn row_values_are_ordered() {
        let a = AuthorAggregate {
            author: "Ann".into(),
            article_count: 2,
            total_payout: 25.0,
        };
        let r = SheetRow::from_aggregate(&a, "5/1/2024");
        assert_eq!(r.values(), json!(["Ann", 2, "$25.00", "5/1/2024"]));
    }

    #[test]
    fn incomplete_credentials_are_rejected() {
        let cfg = SheetsConfig {
            spreadsheet_id: String::new(),
            ..SheetsConfig::default()
        };
        assert!(GoogleSheetsSink::new(&cfg).is_err());
    }

    #[tokio::test]
    async fn memory_sheet_records_rows() {
        let sink = MemorySheet::new();
        let row = SheetRow {
            author: "A".into(),
            articles: 1,
            payout: "$10.00".into(),
            date: "1/2/2024".into(),
        };
        assert_eq!(sink.append_rows(&[row.clone()]).await.unwrap(), 1);
        assert_eq!(sink.appended.lock().unwrap().as_slice(), &[row]);
        assert!(MemorySheet::failing().append_rows(&[]).await.is_err());
    }
}
