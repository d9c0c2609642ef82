//! News Payout Dashboard — Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, persisted state, the news
//! source, the spreadsheet sink and the `/metrics` endpoint.

use std::sync::Arc;

use anyhow::Context;
use news_payout_dashboard::export::sheets::{GoogleSheetsSink, SheetSink};
use news_payout_dashboard::news_api::NewsApiClient;
use news_payout_dashboard::storage::FileStore;
use news_payout_dashboard::api::start;
use news_payout_dashboard::{AppConfig, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_payout_dashboard=info,warn"));

    // Ignore the error if a global subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

fn sheets_sink(cfg: &AppConfig) -> Option<Arc<dyn SheetSink>> {
    if !cfg.sheets.is_configured() {
        info!("spreadsheet export not configured");
        return None;
    }
    match GoogleSheetsSink::new(&cfg.sheets) {
        Ok(sink) => Some(Arc::new(sink)),
        Err(e) => {
            warn!(error = %e, "spreadsheet export disabled");
            None
        }
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load().context("loading dashboard config")?;
    if cfg.news_api.api_key.is_empty() {
        warn!("NEWS_API_KEY is not set; fetches will be rejected upstream");
    }

    let store = Arc::new(FileStore::open(&cfg.storage.path));
    let source = Arc::new(NewsApiClient::new(&cfg.news_api).context("building news client")?);
    let state = AppState::new(source, store, cfg.analytics.clone(), sheets_sink(&cfg));

    let (app, _first_fetch) = start(state)?;

    info!("news payout dashboard ready");
    Ok(app.into())
}
