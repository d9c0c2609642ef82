// src/news_api.rs
//! Article Source Adapter: one GET to the news API per call, no retry, no
//! cache. Sits behind [`ArticleSource`] so the dashboard and tests can swap in
//! a fixture source.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::article::Article;
use crate::config::NewsApiConfig;
use crate::filters::FilterCriteria;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("news API error {code}: {message}")]
    Upstream { code: String, message: String },
    #[error("unexpected news API payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Article>, FetchError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    articles: Option<Vec<Article>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the `/everything` endpoint.
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    default_query: String,
    language: String,
}

impl NewsApiClient {
    pub fn new(cfg: &NewsApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("news-payout-dashboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            default_query: cfg.default_query.clone(),
            language: cfg.language.clone(),
        })
    }

    /// Query string for a criteria snapshot. The type filter is not an
    /// upstream parameter.
    pub fn query_params(&self, criteria: &FilterCriteria) -> Vec<(&'static str, String)> {
        let q = if criteria.search_query.trim().is_empty() {
            self.default_query.clone()
        } else {
            criteria.search_query.clone()
        };
        let mut params = vec![("apiKey", self.api_key.clone()), ("q", q)];
        if let Some(d) = criteria.date_from {
            params.push(("from", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = criteria.date_to {
            params.push(("to", d.format("%Y-%m-%d").to_string()));
        }
        params.push(("language", self.language.clone()));
        params
    }
}

#[async_trait]
impl ArticleSource for NewsApiClient {
    async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Article>, FetchError> {
        let t0 = Instant::now();
        let url = format!("{}/everything", self.base_url);

        let rsp = self
            .http
            .get(&url)
            .query(&self.query_params(criteria))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = rsp.status();
        let body = rsp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        histogram!("news_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let parsed: EverythingResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) if !status.is_success() => {
                warn!(%status, error = %e, "news API returned non-JSON error body");
                return Err(FetchError::Upstream {
                    code: status.as_u16().to_string(),
                    message: status.canonical_reason().unwrap_or("error").to_string(),
                });
            }
            Err(e) => return Err(FetchError::Decode(e.to_string())),
        };

        if parsed.status != "ok" {
            return Err(FetchError::Upstream {
                code: parsed.code.unwrap_or_else(|| status.as_u16().to_string()),
                message: parsed.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let articles = parsed.articles.unwrap_or_default();
        counter!("news_articles_fetched_total").increment(articles.len() as u64);
        debug!(count = articles.len(), "news API fetch ok");
        Ok(articles)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}

/// Serves a fixed article list; used for offline runs and tests.
pub struct StaticSource {
    articles: Vec<Article>,
}

impl StaticSource {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// Parse a `/everything`-shaped JSON document.
    pub fn from_fixture(json: &str) -> Result<Self, FetchError> {
        let parsed: EverythingResponse =
            serde_json::from_str(json).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(Self::new(parsed.articles.unwrap_or_default()))
    }
}

#[async_trait]
impl ArticleSource for StaticSource {
    async fn fetch(&self, _criteria: &FilterCriteria) -> Result<Vec<Article>, FetchError> {
        Ok(self.articles.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
