// tests/config_state.rs
//
// Config loading from disk (env-selected path) and persisted state surviving
// a restart.

use std::sync::Arc;

use serial_test::serial;

use news_payout_dashboard::aggregate::AuthorPayoutPolicy;
use news_payout_dashboard::config::{AppConfig, ENV_CONFIG_PATH, ENV_NEWS_API_KEY};
use news_payout_dashboard::preferences::Preferences;
use news_payout_dashboard::rates::{RateDraft, RateStore};
use news_payout_dashboard::storage::FileStore;

#[test]
#[serial]
fn config_path_from_env_is_loaded_and_secrets_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.toml");
    std::fs::write(
        &path,
        r#"
[news_api]
api_key = "ENV"
default_query = "science"

[storage]
path = "/tmp/state.json"

[analytics]
author_payout_policy = "per_article_type"
day_offset_minutes = 120
"#,
    )
    .unwrap();

    std::env::set_var(ENV_CONFIG_PATH, &path);
    std::env::set_var(ENV_NEWS_API_KEY, "secret-key");
    let cfg = AppConfig::load();
    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_NEWS_API_KEY);

    let cfg = cfg.expect("config loads");
    assert_eq!(cfg.news_api.api_key, "secret-key");
    assert_eq!(cfg.news_api.default_query, "science");
    assert_eq!(cfg.storage.path.to_str(), Some("/tmp/state.json"));
    assert_eq!(
        cfg.analytics.author_payout_policy,
        AuthorPayoutPolicy::PerArticleType
    );
    assert_eq!(cfg.analytics.day_offset().local_minus_utc(), 7200);
}

#[test]
#[serial]
fn missing_env_selected_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(ENV_CONFIG_PATH, dir.path().join("absent.toml"));
    let res = AppConfig::load();
    std::env::remove_var(ENV_CONFIG_PATH);
    assert!(res.is_err());
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[news_api\nbase_url = 1").unwrap();
    assert!(AppConfig::load_from(&path).is_err());
}

#[test]
fn rates_and_dark_mode_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let store = Arc::new(FileStore::open(&path));
        let rates = RateStore::load(store.clone());
        rates.stage(RateDraft {
            news: "8".into(),
            blog: "22.5".into(),
        });
        rates.confirm().unwrap();
        rates.commit().unwrap();
        Preferences::load(store).set_dark_mode(true).unwrap();
    }

    let store = Arc::new(FileStore::open(&path));
    let rates = RateStore::load(store.clone());
    assert_eq!(rates.get().news, 8.0);
    assert_eq!(rates.get().blog, 22.5);
    assert!(Preferences::load(store).dark_mode());
}
