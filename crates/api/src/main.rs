use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use stockpulse_core::analyzer::Analyzer;
use stockpulse_core::domain::analysis::AnalysisBatch;
use stockpulse_core::domain::ticker::Ticker;
use stockpulse_core::market::YahooFinanceProvider;
use stockpulse_core::report::html::{render_page, PageView};
use stockpulse_core::report::json::render_json;

const REPORT_ID_HEADER: HeaderName = HeaderName::from_static("x-report-id");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockpulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let state = match build_analyzer(&settings) {
        Ok(analyzer) => AppState::ready(analyzer),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "analyzer unavailable; starting web UI in degraded mode");
            AppState::degraded(format!("{e:#}"))
        }
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "web UI listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_analyzer(settings: &stockpulse_core::config::Settings) -> anyhow::Result<Analyzer> {
    let llm = stockpulse_core::llm::client_from_settings(settings)?;
    let market = Arc::new(YahooFinanceProvider::from_settings(settings)?);
    Ok(Analyzer::new(market, llm))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/analyze", get(analyze_page))
        .route("/api/analyze", get(analyze_json))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Clone)]
struct AppState {
    analyzer: Option<Arc<Analyzer>>,
    config_error: Option<String>,
}

impl AppState {
    fn ready(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Some(Arc::new(analyzer)),
            config_error: None,
        }
    }

    fn degraded(config_error: String) -> Self {
        Self {
            analyzer: None,
            config_error: Some(config_error),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    tickers: String,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Response {
    let mut view = PageView::new("");
    if let Some(err) = &state.config_error {
        view = view.with_error(err.clone());
    }
    page_response(StatusCode::OK, &view)
}

async fn analyze_page(State(state): State<AppState>, Query(query): Query<AnalyzeQuery>) -> Response {
    let view = PageView::new(query.tickers.clone());

    let Some(analyzer) = &state.analyzer else {
        let err = state.config_error.clone().unwrap_or_default();
        return page_response(StatusCode::SERVICE_UNAVAILABLE, &view.with_error(err));
    };

    let tickers = match parse_tickers(&query.tickers) {
        Ok(tickers) => tickers,
        Err(e) => {
            return page_response(StatusCode::BAD_REQUEST, &view.with_error(format!("{e:#}")))
        }
    };

    let (_, batch) = run_batch(analyzer, &tickers).await;
    page_response(StatusCode::OK, &view.with_batch(&batch))
}

async fn analyze_json(State(state): State<AppState>, Query(query): Query<AnalyzeQuery>) -> Response {
    let Some(analyzer) = &state.analyzer else {
        let err = state.config_error.clone().unwrap_or_default();
        return (StatusCode::SERVICE_UNAVAILABLE, err).into_response();
    };

    let tickers = match parse_tickers(&query.tickers) {
        Ok(tickers) => tickers,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("{e:#}")).into_response(),
    };

    let (report_id, batch) = run_batch(analyzer, &tickers).await;
    match render_json(&batch) {
        Ok(body) => {
            let mut res = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&report_id.to_string()) {
                res.headers_mut().insert(REPORT_ID_HEADER, value);
            }
            res
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn parse_tickers(input: &str) -> anyhow::Result<Vec<Ticker>> {
    let tickers = Ticker::parse_list(input)?;
    anyhow::ensure!(!tickers.is_empty(), "Please enter at least one ticker symbol.");
    Ok(tickers)
}

async fn run_batch(analyzer: &Analyzer, tickers: &[Ticker]) -> (Uuid, AnalysisBatch) {
    let report_id = Uuid::new_v4();
    tracing::info!(%report_id, count = tickers.len(), "analyzing stocks");
    let batch = analyzer.analyze_tickers(tickers).await;
    tracing::info!(
        %report_id,
        generated_at = %batch.generated_at,
        failures = batch.has_failures(),
        "analysis batch finished"
    );
    (report_id, batch)
}

fn page_response(status: StatusCode, view: &PageView) -> Response {
    match render_page(view) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "page render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockpulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
