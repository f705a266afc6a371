use crate::config::Settings;
use crate::domain::snapshot::{
    period_return_pct, target_upside_pct, FinancialSnapshot, NewsArticle, StockMetrics,
    NOT_AVAILABLE,
};
use crate::domain::ticker::Ticker;
use crate::market::error::FetchError;
use crate::market::provider::MarketDataProvider;
use crate::market::types::{
    raw, ChartEnvelope, QuoteSummaryEnvelope, QuoteSummaryResult, SearchNewsItem, SearchResponse,
};
use anyhow::Context;
use chrono::DateTime;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
const SUMMARY_MODULES: &str =
    "price,summaryProfile,summaryDetail,financialData,defaultKeyStatistics";

#[derive(Debug, Clone)]
pub struct YahooFinanceProvider {
    http: reqwest::Client,
    base_url: String,
    cookie_url: String,
    lookback_range: String,
    news_limit: usize,
    /// Session crumb for `quoteSummary`, shared by clones and fetched once.
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooFinanceProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let cookie_url = settings
            .market_data_cookie_url
            .clone()
            .unwrap_or_else(|| DEFAULT_COOKIE_URL.to_string());
        let timeout_secs = settings
            .market_data_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            cookie_url,
            lookback_range: settings.lookback_range().to_string(),
            news_limit: settings.news_limit(),
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ticker: &Ticker,
        path: &str,
        query: &[(&str, String)],
        what: &'static str,
    ) -> Result<T, FetchError> {
        let res = self.http.get(self.url(path)).query(query).send().await?;

        let status = res.status();
        let text = res.text().await?;
        match status {
            StatusCode::NOT_FOUND => return Err(FetchError::UnknownTicker(ticker.clone())),
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            s if !s.is_success() => {
                return Err(FetchError::Http {
                    status: s,
                    body: text,
                })
            }
            _ => {}
        }

        serde_json::from_str::<T>(&text).map_err(|source| FetchError::Decode { what, source })
    }

    /// Returns the cached crumb, running the cookie + crumb handshake on first use.
    /// The lock is held across the handshake so concurrent callers share one.
    async fn crumb(&self) -> Result<String, FetchError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters here; fc.yahoo.com answers 404.
        let res = self.http.get(&self.cookie_url).send().await?;
        tracing::debug!(status = %res.status(), "Yahoo session cookie requested");

        let res = self.http.get(self.url("/v1/test/getcrumb")).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Crumb(format!("HTTP {status}: {text}")));
        }

        let crumb = text.trim();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.contains('<') {
            return Err(FetchError::Crumb(format!("unexpected crumb body: {text}")));
        }

        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn fetch_quote_summary(&self, ticker: &Ticker) -> Result<QuoteSummaryResult, FetchError> {
        let crumb = self.crumb().await?;
        let path = format!("/v10/finance/quoteSummary/{ticker}");
        let envelope: QuoteSummaryEnvelope = match self
            .get_json(
                ticker,
                &path,
                &[
                    ("modules", SUMMARY_MODULES.to_string()),
                    ("crumb", crumb),
                ],
                "quote summary",
            )
            .await
        {
            Ok(envelope) => envelope,
            Err(err) => {
                if matches!(err, FetchError::Http { status: StatusCode::UNAUTHORIZED, .. }) {
                    tracing::warn!(%ticker, "Yahoo rejected the crumb; refreshing it for the next request");
                    *self.crumb.lock().await = None;
                }
                return Err(err);
            }
        };

        let summary = envelope.quote_summary;
        if let Some(err) = &summary.error {
            if err.code.eq_ignore_ascii_case("Not Found") {
                return Err(FetchError::UnknownTicker(ticker.clone()));
            }
            tracing::warn!(%ticker, code = %err.code, description = %err.description, "quote summary returned an error");
        }

        summary
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| FetchError::UnknownTicker(ticker.clone()))
    }

    async fn fetch_closes(&self, ticker: &Ticker) -> Result<Vec<f64>, FetchError> {
        let path = format!("/v8/finance/chart/{ticker}");
        let envelope: ChartEnvelope = self
            .get_json(
                ticker,
                &path,
                &[
                    ("range", self.lookback_range.clone()),
                    ("interval", "1d".to_string()),
                ],
                "price chart",
            )
            .await?;

        let closes = envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.indicators.quote.into_iter().next())
            .map(|quote| quote.close.into_iter().flatten().collect())
            .unwrap_or_default();
        Ok(closes)
    }

    async fn fetch_news(&self, ticker: &Ticker) -> Result<Vec<NewsArticle>, FetchError> {
        if self.news_limit == 0 {
            return Ok(Vec::new());
        }

        let search: SearchResponse = self
            .get_json(
                ticker,
                "/v1/finance/search",
                &[
                    ("q", ticker.to_string()),
                    ("quotesCount", "0".to_string()),
                    ("newsCount", self.news_limit.to_string()),
                ],
                "news search",
            )
            .await?;

        let mut articles = Vec::new();
        for item in search.news {
            match serde_json::from_value::<SearchNewsItem>(item) {
                Ok(item) => articles.push(news_article(item)),
                Err(err) => {
                    tracing::warn!(%ticker, error = %err, "skipping malformed news item");
                }
            }
            if articles.len() >= self.news_limit {
                break;
            }
        }
        Ok(articles)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_snapshot(&self, ticker: &Ticker) -> Result<FinancialSnapshot, FetchError> {
        let summary = self.fetch_quote_summary(ticker).await?;

        let closes = match self.fetch_closes(ticker).await {
            Ok(closes) => closes,
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "price history unavailable; yearly return omitted");
                Vec::new()
            }
        };

        let news = match self.fetch_news(ticker).await {
            Ok(news) => news,
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "news unavailable; continuing without headlines");
                Vec::new()
            }
        };

        let metrics = build_metrics(ticker, &summary, &closes)?;
        tracing::debug!(
            %ticker,
            price = metrics.current_price,
            news_len = news.len(),
            "fetched market snapshot"
        );
        Ok(FinancialSnapshot { metrics, news })
    }
}

fn build_metrics(
    ticker: &Ticker,
    summary: &QuoteSummaryResult,
    closes: &[f64],
) -> Result<StockMetrics, FetchError> {
    let price = summary.price.clone().unwrap_or_default();
    let profile = summary.summary_profile.clone().unwrap_or_default();
    let detail = summary.summary_detail.clone().unwrap_or_default();
    let financial = summary.financial_data.clone().unwrap_or_default();
    let stats = summary.default_key_statistics.clone().unwrap_or_default();

    let current_price = raw(&financial.current_price)
        .or_else(|| raw(&price.regular_market_price))
        .filter(|p| *p > 0.0)
        .ok_or_else(|| FetchError::MissingPrice(ticker.clone()))?;

    let mut metrics = StockMetrics::new(ticker.clone(), current_price);
    if let Some(name) = price
        .short_name
        .or(price.long_name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        metrics.name = name;
    }
    if let Some(sector) = profile.sector.filter(|s| !s.trim().is_empty()) {
        metrics.sector = sector;
    }
    if let Some(industry) = profile.industry.filter(|s| !s.trim().is_empty()) {
        metrics.industry = industry;
    }

    metrics.target_price = raw(&financial.target_mean_price);
    metrics.target_upside_pct = target_upside_pct(current_price, metrics.target_price);
    metrics.yearly_return_pct = period_return_pct(closes);
    metrics.pe_ratio = raw(&detail.trailing_pe);
    metrics.forward_pe = raw(&detail.forward_pe).or_else(|| raw(&stats.forward_pe));
    metrics.peg_ratio = raw(&stats.peg_ratio);
    metrics.price_to_book = raw(&stats.price_to_book);
    metrics.dividend_yield_pct = raw(&detail.dividend_yield).map(|v| v * 100.0);
    metrics.eps = raw(&stats.trailing_eps);
    metrics.roe_pct = raw(&financial.return_on_equity).map(|v| v * 100.0);
    metrics.roa_pct = raw(&financial.return_on_assets).map(|v| v * 100.0);
    metrics.debt_to_equity = raw(&financial.debt_to_equity);
    metrics.quick_ratio = raw(&financial.quick_ratio);
    metrics.current_ratio = raw(&financial.current_ratio);
    metrics.market_cap = raw(&price.market_cap).or_else(|| raw(&detail.market_cap));
    metrics.recommendation = financial
        .recommendation_key
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Ok(metrics)
}

fn news_article(item: SearchNewsItem) -> NewsArticle {
    let published = item
        .provider_publish_time
        .filter(|ts| *ts > 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    NewsArticle {
        title: non_blank(item.title).unwrap_or_else(|| "No title available".to_string()),
        publisher: non_blank(item.publisher).unwrap_or_else(|| "Unknown source".to_string()),
        link: non_blank(item.link).unwrap_or_else(|| "#".to_string()),
        published,
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
