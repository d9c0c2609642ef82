// tests/startup.rs
//
// The first background fetch is recorded by the Prometheus recorder.
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use news_payout_dashboard::api::start;
use news_payout_dashboard::config::AnalyticsConfig;
use news_payout_dashboard::dashboard::FeedSummary;
use news_payout_dashboard::news_api::StaticSource;
use news_payout_dashboard::storage::MemoryStore;
use news_payout_dashboard::AppState;

#[tokio::test]
async fn first_fetch_is_counted() {
    let state = AppState::new(
        Arc::new(StaticSource::new(vec![])),
        Arc::new(MemoryStore::new()),
        AnalyticsConfig::default(),
        None,
    );
    let (app, first_fetch) = start(state).expect("recorder installs once per process");
    assert_eq!(
        first_fetch.await.unwrap(),
        FeedSummary::Ready { articles: 0 }
    );

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(
        text.contains("news_fetch_total{source=\"static\"} 1"),
        "first fetch not recorded:\n{text}"
    );
}
