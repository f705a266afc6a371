//! Wire shapes of the Yahoo Finance endpoints. Every field is optional: Yahoo omits data
//! freely and encodes missing numbers as `{}`.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNumber {
    #[serde(default)]
    pub raw: Option<f64>,
}

pub(crate) fn raw(n: &Option<RawNumber>) -> Option<f64> {
    n.as_ref().and_then(|n| n.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryEnvelope {
    pub quote_summary: QuoteSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummary {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    pub error: Option<YahooError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteSummaryResult {
    pub price: Option<PriceModule>,
    pub summary_profile: Option<SummaryProfile>,
    pub summary_detail: Option<SummaryDetail>,
    pub financial_data: Option<FinancialData>,
    pub default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceModule {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<RawNumber>,
    pub market_cap: Option<RawNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<RawNumber>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<RawNumber>,
    pub dividend_yield: Option<RawNumber>,
    pub market_cap: Option<RawNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialData {
    pub current_price: Option<RawNumber>,
    pub target_mean_price: Option<RawNumber>,
    pub return_on_equity: Option<RawNumber>,
    pub return_on_assets: Option<RawNumber>,
    pub debt_to_equity: Option<RawNumber>,
    pub quick_ratio: Option<RawNumber>,
    pub current_ratio: Option<RawNumber>,
    pub recommendation_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyStatistics {
    pub peg_ratio: Option<RawNumber>,
    pub price_to_book: Option<RawNumber>,
    pub trailing_eps: Option<RawNumber>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<RawNumber>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartResult {
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartIndicators {
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartQuote {
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub news: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchNewsItem {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub provider_publish_time: Option<i64>,
}
