use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Register metric descriptions (idempotent).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_fetch_total", "News fetches started, by source.");
        describe_counter!(
            "news_fetch_errors_total",
            "News fetches that failed (network, upstream or decode)."
        );
        describe_counter!(
            "news_fetch_stale_total",
            "Fetch results discarded because a newer fetch was already applied."
        );
        describe_counter!(
            "news_articles_fetched_total",
            "Articles received from the news API."
        );
        describe_histogram!("news_fetch_ms", "News API round-trip time in milliseconds.");
        describe_counter!("export_total", "Successful report exports, by target.");
        describe_counter!("export_errors_total", "Failed report exports, by target.");
        describe_counter!("rates_commits_total", "Committed payout-rate changes.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if a recorder is already set.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe();
        Ok(Self { handle })
    }

    /// `/metrics`: fetch, export and rate-commit series in text exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
