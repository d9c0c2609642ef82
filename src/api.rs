// src/api.rs
//! HTTP surface of the dashboard. Everything except `/health` and
//! `/auth/login` needs a bearer token from `/auth/login`.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::config::AnalyticsConfig;
use crate::dashboard::{AnalyticsView, Dashboard, DashboardError, FeedSummary};
use crate::export::sheets::SheetSink;
use crate::export::{ExportError, ExportFile, ExportTarget, Exporter, Notification};
use crate::filters::{FilterCriteria, FilterPatch};
use crate::metrics::Metrics;
use crate::news_api::ArticleSource;
use crate::preferences::{Preferences, PreferencesView};
use crate::rates::{PendingChange, RateConfig, RateDraft, RateError, RateStore};
use crate::session::{AuthError, Session, SessionStore, User};
use crate::storage::KeyValueStore;
use crate::table::{TableAction, TableView};

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub sessions: Arc<SessionStore>,
    pub rates: Arc<RateStore>,
    pub preferences: Arc<Preferences>,
    pub exporter: Arc<Exporter>,
}

impl AppState {
    /// Wire state objects over one article source and one persisted store.
    pub fn new(
        source: Arc<dyn ArticleSource>,
        store: Arc<dyn KeyValueStore>,
        analytics: AnalyticsConfig,
        sheets: Option<Arc<dyn SheetSink>>,
    ) -> Self {
        let rates = Arc::new(RateStore::load(store.clone()));
        Self {
            dashboard: Arc::new(Dashboard::new(source, rates.clone(), analytics)),
            sessions: Arc::new(SessionStore::new()),
            rates,
            preferences: Arc::new(Preferences::load(store)),
            exporter: Arc::new(Exporter::new(sheets)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/filters", get(get_filters).put(put_filters))
        .route("/refresh", post(refresh))
        .route("/analytics", get(analytics))
        .route("/payouts/table", get(table_view).post(table_action))
        .route("/rates", get(get_rates))
        .route("/rates/stage", post(stage_rates))
        .route("/rates/confirm", post(confirm_rates))
        .route("/rates/cancel", post(cancel_rates))
        .route("/rates/commit", post(commit_rates))
        .route("/preferences", get(get_preferences).put(put_preferences))
        .route("/preferences/toggle-dark-mode", post(toggle_dark_mode))
        .route("/export/csv", get(export_csv))
        .route("/export/pdf", get(export_pdf))
        .route("/export/sheets", post(export_sheets))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Install the metrics recorder, start the first fetch in the background and
/// return the full app with `/metrics` merged in. Data routes answer 503
/// until the returned fetch lands.
pub fn start(state: AppState) -> anyhow::Result<(Router, JoinHandle<FeedSummary>)> {
    let metrics = Metrics::init().context("installing metrics recorder")?;
    let dashboard = state.dashboard.clone();
    let first_fetch = tokio::spawn(async move { dashboard.refresh().await });
    Ok((router(state).merge(metrics.router()), first_fetch))
}

// ---------- errors ----------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    notification: Option<Notification>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            notification: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.notification {
            Some(n) => json!({ "error": self.message, "notification": n }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        let status = match &e {
            DashboardError::Loading => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Failed(_) => StatusCode::BAD_GATEWAY,
            DashboardError::Filter(_) | DashboardError::Table(_) => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<RateError> for ApiError {
    fn from(e: RateError) -> Self {
        let status = match &e {
            RateError::NothingStaged | RateError::NotConfirmed => StatusCode::CONFLICT,
            RateError::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RateError::Persist(err) => {
                error!(error = %err, "rate persistence failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let status = match e {
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %e, "request failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

fn export_error(target: ExportTarget, e: ExportError) -> ApiError {
    let status = match e {
        ExportError::Busy => StatusCode::CONFLICT,
        ExportError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = e.to_string();
    let res: Result<(), ExportError> = Err(e);
    ApiError {
        status,
        message,
        notification: Some(Notification::for_result(target, &res)),
    }
}

// ---------- auth ----------

/// Signed-in user resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser {
    pub token: String,
    pub user: User,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.strip_prefix("Bearer ")
                    .or_else(|| v.strip_prefix("bearer "))
            })
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthenticated)?;
        let user = state.sessions.user(token)?;
        Ok(CurrentUser {
            token: token.to_string(),
            user,
        })
    }
}

#[derive(Deserialize)]
struct LoginReq {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.login(&body.email, &body.password)?))
}

async fn logout(State(state): State<AppState>, who: CurrentUser) -> StatusCode {
    state.sessions.logout(&who.token);
    StatusCode::NO_CONTENT
}

// ---------- feed ----------

#[derive(Serialize)]
struct FiltersResp {
    criteria: FilterCriteria,
    feed: FeedSummary,
}

async fn get_filters(State(state): State<AppState>, _who: CurrentUser) -> Json<FilterCriteria> {
    Json(state.dashboard.criteria())
}

async fn put_filters(
    State(state): State<AppState>,
    _who: CurrentUser,
    Json(patch): Json<FilterPatch>,
) -> Result<Json<FiltersResp>, ApiError> {
    let feed = state.dashboard.update_filters(patch).await?;
    Ok(Json(FiltersResp {
        criteria: state.dashboard.criteria(),
        feed,
    }))
}

async fn refresh(State(state): State<AppState>, _who: CurrentUser) -> Json<FeedSummary> {
    Json(state.dashboard.refresh().await)
}

async fn analytics(
    State(state): State<AppState>,
    _who: CurrentUser,
) -> Result<Json<AnalyticsView>, ApiError> {
    Ok(Json(state.dashboard.analytics()?))
}

async fn table_view(
    State(state): State<AppState>,
    _who: CurrentUser,
) -> Result<Json<TableView>, ApiError> {
    Ok(Json(state.dashboard.table_view()?))
}

async fn table_action(
    State(state): State<AppState>,
    _who: CurrentUser,
    Json(action): Json<TableAction>,
) -> Result<Json<TableView>, ApiError> {
    Ok(Json(state.dashboard.apply_table_action(action)?))
}

// ---------- rates ----------

#[derive(Serialize)]
struct RatesResp {
    current: RateConfig,
    pending: Option<PendingChange>,
}

fn rates_view(rates: &RateStore) -> Json<RatesResp> {
    Json(RatesResp {
        current: rates.get(),
        pending: rates.pending(),
    })
}

async fn get_rates(State(state): State<AppState>, _who: CurrentUser) -> Json<RatesResp> {
    rates_view(&state.rates)
}

async fn stage_rates(
    State(state): State<AppState>,
    _who: CurrentUser,
    Json(draft): Json<RateDraft>,
) -> Json<RatesResp> {
    state.rates.stage(draft);
    rates_view(&state.rates)
}

async fn confirm_rates(
    State(state): State<AppState>,
    _who: CurrentUser,
) -> Result<Json<RatesResp>, ApiError> {
    state.rates.confirm()?;
    Ok(rates_view(&state.rates))
}

async fn cancel_rates(State(state): State<AppState>, _who: CurrentUser) -> Json<RatesResp> {
    state.rates.cancel();
    rates_view(&state.rates)
}

async fn commit_rates(
    State(state): State<AppState>,
    _who: CurrentUser,
) -> Result<Json<RatesResp>, ApiError> {
    state.rates.commit()?;
    Ok(rates_view(&state.rates))
}

// ---------- preferences ----------

#[derive(Deserialize)]
struct PreferencesReq {
    dark_mode: bool,
}

async fn get_preferences(State(state): State<AppState>, _who: CurrentUser) -> Json<PreferencesView> {
    Json(state.preferences.view())
}

async fn put_preferences(
    State(state): State<AppState>,
    _who: CurrentUser,
    Json(body): Json<PreferencesReq>,
) -> Result<Json<PreferencesView>, ApiError> {
    state.preferences.set_dark_mode(body.dark_mode)?;
    Ok(Json(state.preferences.view()))
}

async fn toggle_dark_mode(
    State(state): State<AppState>,
    _who: CurrentUser,
) -> Result<Json<PreferencesView>, ApiError> {
    state.preferences.toggle_dark_mode()?;
    Ok(Json(state.preferences.view()))
}

// ---------- export ----------

fn download(file: ExportFile, note: &Notification) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    let mut rsp = (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response();
    if let Ok(v) = HeaderValue::from_str(&note.message) {
        rsp.headers_mut().insert("x-notification", v);
    }
    rsp
}

async fn export_csv(State(state): State<AppState>, _who: CurrentUser) -> Result<Response, ApiError> {
    let rows = state.dashboard.author_rows()?;
    let res = state.exporter.export_csv(&rows);
    let note = Notification::for_result(ExportTarget::Csv, &res);
    let file = res.map_err(|e| export_error(ExportTarget::Csv, e))?;
    Ok(download(file, &note))
}

async fn export_pdf(State(state): State<AppState>, _who: CurrentUser) -> Result<Response, ApiError> {
    let rows = state.dashboard.author_rows()?;
    let res = state.exporter.export_pdf(&rows);
    let note = Notification::for_result(ExportTarget::Pdf, &res);
    let file = res.map_err(|e| export_error(ExportTarget::Pdf, e))?;
    Ok(download(file, &note))
}

#[derive(Serialize)]
struct SheetsResp {
    appended: usize,
    notification: Notification,
}

async fn export_sheets(
    State(state): State<AppState>,
    _who: CurrentUser,
) -> Result<Json<SheetsResp>, ApiError> {
    let rows = state.dashboard.author_rows()?;
    let today = chrono::Local::now().date_naive();
    let res = state.exporter.export_sheets(&rows, today).await;
    let notification = Notification::for_result(ExportTarget::Sheets, &res);
    let appended = res.map_err(|e| export_error(ExportTarget::Sheets, e))?;
    Ok(Json(SheetsResp {
        appended,
        notification,
    }))
}
